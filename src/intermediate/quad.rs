use std::fmt::Display;

use crate::symbol::symbol::SymbolTable;

use super::operand::Operand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Assign,
    Array,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// Branch to `z` when `x` is true.
    Ifb,
    Jump,
    Unit,
    Endu,
    Call,
    Ret,
    Par,
}

impl Operator {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div | Operator::Mod
        )
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge
        )
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Operator::Assign => ":=",
            Operator::Array => "array",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "mod",
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Ifb => "ifb",
            Operator::Jump => "jump",
            Operator::Unit => "unit",
            Operator::Endu => "endu",
            Operator::Call => "call",
            Operator::Ret => "ret",
            Operator::Par => "par",
        };
        write!(f, "{}", text)
    }
}

/// One intermediate instruction.
///
/// `number` equals the quad's label while the quad is active; the optimizer
/// removes a quad by negating it, so the slot and its label stay put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quad {
    pub number: i32,
    pub op: Operator,
    pub x: Operand,
    pub y: Operand,
    pub z: Operand,
}

impl Quad {
    pub fn is_active(&self) -> bool {
        self.number > 0
    }

    pub fn label(&self) -> u32 {
        self.number.unsigned_abs()
    }

    pub fn deactivate(&mut self) {
        self.number = -self.number.abs();
    }

    /// `n: op, x, y, z`
    pub fn render(&self, symbols: &SymbolTable) -> String {
        format!(
            "{}: {}, {}, {}, {}",
            self.number,
            self.op,
            self.x.name(symbols),
            self.y.name(symbols),
            self.z.name(symbols)
        )
    }
}
