//! Peephole passes over the quads of one flushed unit.
//!
//! The passes run once each, in a fixed order. Inverse copy propagation has
//! to come first: folding rewrites the arithmetic quad into an assignment and
//! the pattern it looks for disappears.

use std::ops::Range;

use log::debug;

use crate::{
    errors::errors::Error,
    symbol::{
        entry::{ConstValue, EntryKind},
        symbol::SymbolTable,
    },
    types::types::Type,
};

use super::{
    intermediate::QuadBuffer,
    operand::Operand,
    quad::Operator,
};

pub fn optimize(
    quads: &mut QuadBuffer,
    range: Range<u32>,
    symbols: &mut SymbolTable,
) -> Result<(), Error> {
    debug!("optimizing quads {}..{}", range.start, range.end);
    inverse_copy_propagation(quads, range.clone(), symbols)?;
    fold_constants(quads, range.clone(), symbols)?;
    algebraic_identities(quads, range.clone(), symbols)?;
    remove_jumps_to_next(quads, range)?;
    Ok(())
}

fn integer_constant(operand: &Operand, symbols: &SymbolTable) -> Option<i16> {
    match operand {
        Operand::Symbol(id) => match &symbols.entry(*id).kind {
            EntryKind::Constant {
                value: ConstValue::Integer(value),
                ..
            } => Some(*value),
            _ => None,
        },
        _ => None,
    }
}

/// `t := a op b; d := t` becomes `d := a op b`.
fn inverse_copy_propagation(
    quads: &mut QuadBuffer,
    range: Range<u32>,
    symbols: &SymbolTable,
) -> Result<(), Error> {
    for label in range.start..range.end.saturating_sub(1) {
        let (current, next) = (quads.get(label)?, quads.get(label + 1)?);
        if !current.is_active() || !next.is_active() {
            continue;
        }
        if !current.op.is_arithmetic() || next.op != Operator::Assign {
            continue;
        }
        let temporary = match current.z {
            Operand::Symbol(id) if symbols.entry(id).is_temporary() => id,
            _ => continue,
        };
        if next.x != Operand::Symbol(temporary) {
            continue;
        }

        let destination = next.z;
        quads.get_mut(label)?.z = destination;
        quads.get_mut(label + 1)?.deactivate();
        debug!(
            "inverse copy propagation: quad {} now writes {}, quad {} removed",
            label,
            destination.name(symbols),
            label + 1
        );
    }
    Ok(())
}

fn evaluate(op: Operator, left: i16, right: i16) -> Option<i16> {
    match op {
        Operator::Add => Some(left.wrapping_add(right)),
        Operator::Sub => Some(left.wrapping_sub(right)),
        Operator::Mul => Some(left.wrapping_mul(right)),
        // Division by zero and overflow are left to trap at run time.
        Operator::Div => left.checked_div(right),
        Operator::Mod => left.checked_rem(right),
        _ => None,
    }
}

fn fold_constants(
    quads: &mut QuadBuffer,
    range: Range<u32>,
    symbols: &mut SymbolTable,
) -> Result<(), Error> {
    for label in range {
        let quad = quads.get(label)?;
        if !quad.is_active() || !quad.op.is_arithmetic() {
            continue;
        }
        let (Some(left), Some(right)) = (
            integer_constant(&quad.x, symbols),
            integer_constant(&quad.y, symbols),
        ) else {
            continue;
        };
        let Some(value) = evaluate(quad.op, left, right) else {
            continue;
        };

        let constant = symbols.declare_constant(None, Type::Integer, ConstValue::Integer(value))?;
        let quad = quads.get_mut(label)?;
        debug!(
            "constant folding: quad {} `{} {} {}` is {}",
            label, left, quad.op, right, value
        );
        quad.op = Operator::Assign;
        quad.x = Operand::Symbol(constant);
        quad.y = Operand::Null;
    }
    Ok(())
}

fn algebraic_identities(
    quads: &mut QuadBuffer,
    range: Range<u32>,
    symbols: &SymbolTable,
) -> Result<(), Error> {
    for label in range {
        let quad = quads.get_mut(label)?;
        if !quad.is_active() {
            continue;
        }
        let left = integer_constant(&quad.x, symbols);
        let right = integer_constant(&quad.y, symbols);

        let kept = match (quad.op, left, right) {
            (Operator::Add, Some(0), _) => quad.y,
            (Operator::Add, _, Some(0)) => quad.x,
            (Operator::Mul, Some(0), _) => quad.x,
            (Operator::Mul, Some(1), _) => quad.y,
            (Operator::Mul, _, Some(0)) => quad.y,
            (Operator::Mul, _, Some(1)) => quad.x,
            _ => continue,
        };

        debug!("algebraic identity: quad {} becomes an assignment", label);
        quad.op = Operator::Assign;
        quad.x = kept;
        quad.y = Operand::Null;
    }
    Ok(())
}

fn remove_jumps_to_next(quads: &mut QuadBuffer, range: Range<u32>) -> Result<(), Error> {
    for label in range {
        let quad = quads.get_mut(label)?;
        if quad.is_active() && quad.op == Operator::Jump && quad.z == Operand::QuadLabel(label + 1) {
            quad.deactivate();
            debug!("jump at quad {} falls through, removed", label);
        }
    }
    Ok(())
}
