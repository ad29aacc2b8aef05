use std::fmt::Display;

use crate::symbol::{entry::EntryId, symbol::SymbolTable};

/// How the argument of a `par` quad is handed to the callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passing {
    Value,
    Reference,
    /// Address of the slot that receives the callee's result.
    Result,
}

impl Display for Passing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Passing::Value => write!(f, "V"),
            Passing::Reference => write!(f, "R"),
            Passing::Result => write!(f, "RET"),
        }
    }
}

/// A value referenced by a quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Symbol(EntryId),
    QuadLabel(u32),
    Unit(EntryId),
    /// The storage an address-holding entry points to, printed `[x]`.
    Dereference(EntryId),
    /// The address of an entry, printed `{x}`.
    Address(EntryId),
    Pass(Passing),
    /// The result slot of the function being compiled, printed `$$`.
    Result,
    Null,
    /// A jump target that is filled in by backpatching, printed `*`.
    Placeholder,
}

impl Operand {
    /// The symbol table entry the operand refers to, if any.
    pub fn entry(&self) -> Option<EntryId> {
        match self {
            Operand::Symbol(id)
            | Operand::Unit(id)
            | Operand::Dereference(id)
            | Operand::Address(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Operand::Placeholder)
    }

    /// Printable form used by the IR dump and the assembly comments.
    pub fn name(&self, symbols: &SymbolTable) -> String {
        match self {
            Operand::Symbol(id) | Operand::Unit(id) => symbols.entry(*id).name.clone(),
            Operand::QuadLabel(label) => label.to_string(),
            Operand::Dereference(id) => format!("[{}]", symbols.entry(*id).name),
            Operand::Address(id) => format!("{{{}}}", symbols.entry(*id).name),
            Operand::Pass(passing) => passing.to_string(),
            Operand::Result => String::from("$$"),
            Operand::Null => String::from("-"),
            Operand::Placeholder => String::from("*"),
        }
    }
}
