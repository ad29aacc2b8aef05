//! The quad buffer and the deferred-target list operations built on it.

use std::ops::Range;

use log::debug;

use crate::{
    errors::errors::{Error, ErrorImpl},
    symbol::{entry::ConstValue, symbol::SymbolTable},
    types::types::Type,
    MK_ERROR, MK_INTERNAL,
};

use super::{
    operand::Operand,
    quad::{Operator, Quad},
};

/// Labels of quads still waiting for a jump target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelList {
    labels: Vec<u32>,
}

impl LabelList {
    pub fn empty() -> Self {
        LabelList { labels: vec![] }
    }

    pub fn single(label: u32) -> Self {
        LabelList {
            labels: vec![label],
        }
    }

    pub fn merge(mut self, other: LabelList) -> Self {
        self.labels.extend(other.labels);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }
}

/// Append-only quad storage. Labels start at 1 and never move.
#[derive(Debug)]
pub struct QuadBuffer {
    quads: Vec<Quad>,
    /// First label not yet handed to the optimizer and the code generator.
    flushed: u32,
}

impl Default for QuadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadBuffer {
    pub fn new() -> Self {
        QuadBuffer {
            quads: vec![],
            flushed: 1,
        }
    }

    /// Label the next emitted quad will get.
    pub fn next_quad(&self) -> u32 {
        self.quads.len() as u32 + 1
    }

    pub fn emit(&mut self, op: Operator, x: Operand, y: Operand, z: Operand) -> u32 {
        let label = self.next_quad();
        self.quads.push(Quad {
            number: label as i32,
            op,
            x,
            y,
            z,
        });
        label
    }

    pub fn get(&self, label: u32) -> Result<&Quad, Error> {
        label
            .checked_sub(1)
            .and_then(|index| self.quads.get(index as usize))
            .ok_or_else(|| MK_INTERNAL!("quad {} does not exist", label))
    }

    pub fn get_mut(&mut self, label: u32) -> Result<&mut Quad, Error> {
        label
            .checked_sub(1)
            .and_then(|index| self.quads.get_mut(index as usize))
            .ok_or_else(|| MK_INTERNAL!("quad {} does not exist", label))
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Quads emitted since the last flush.
    pub fn pending(&self) -> Range<u32> {
        self.flushed..self.next_quad()
    }

    /// Hands out the pending range and moves the flush marker past it.
    pub fn flush(&mut self) -> Range<u32> {
        let range = self.pending();
        self.flushed = range.end;
        range
    }

    pub fn range(&self, range: Range<u32>) -> Result<&[Quad], Error> {
        if range.start == 0 || range.start > range.end || range.end > self.next_quad() {
            return Err(MK_INTERNAL!(
                "invalid quad range {}..{}",
                range.start,
                range.end
            ));
        }
        Ok(&self.quads[range.start as usize - 1..range.end as usize - 1])
    }

    /// One `n: op, x, y, z` line per active quad of the range.
    pub fn dump_range(&self, range: Range<u32>, symbols: &SymbolTable) -> Result<String, Error> {
        let mut dump = String::new();
        for quad in self.range(range)?.iter().filter(|quad| quad.is_active()) {
            dump.push_str(&quad.render(symbols));
            dump.push('\n');
        }
        Ok(dump)
    }

    /// Fills every placeholder of the listed quads with `target` and empties the list.
    pub fn backpatch(&mut self, list: &mut LabelList, target: u32) -> Result<(), Error> {
        for label in list.labels.drain(..) {
            let quad = self.get_mut(label)?;
            let mut patched = false;
            for operand in [&mut quad.x, &mut quad.y, &mut quad.z] {
                if operand.is_placeholder() {
                    *operand = Operand::QuadLabel(target);
                    patched = true;
                }
            }
            if !patched {
                return Err(MK_ERROR!(ErrorImpl::DoubleBackpatch { label }));
            }
            debug!("backpatched quad {} to {}", label, target);
        }
        Ok(())
    }

    /// Emits `ifb place, -, *` and `jump -, -, *`, returning the TRUE and FALSE lists.
    pub fn begin_condition(&mut self, place: Operand) -> (LabelList, LabelList) {
        let on_true = self.emit(Operator::Ifb, place, Operand::Null, Operand::Placeholder);
        let on_false = self.emit(
            Operator::Jump,
            Operand::Null,
            Operand::Null,
            Operand::Placeholder,
        );
        (LabelList::single(on_true), LabelList::single(on_false))
    }

    /// Turns a pending condition into a boolean temporary holding its value.
    pub fn materialize_condition(
        &mut self,
        symbols: &mut SymbolTable,
        mut on_true: LabelList,
        mut on_false: LabelList,
    ) -> Result<Operand, Error> {
        let place = symbols.declare_temporary(Type::Boolean)?;
        let truth = symbols.declare_constant(None, Type::Boolean, ConstValue::Boolean(true))?;
        let falsehood = symbols.declare_constant(None, Type::Boolean, ConstValue::Boolean(false))?;

        let target = self.next_quad();
        self.backpatch(&mut on_true, target)?;
        self.emit(
            Operator::Assign,
            Operand::Symbol(truth),
            Operand::Null,
            Operand::Symbol(place),
        );
        let after = self.next_quad() + 2;
        self.emit(
            Operator::Jump,
            Operand::Null,
            Operand::Null,
            Operand::QuadLabel(after),
        );
        let target = self.next_quad();
        self.backpatch(&mut on_false, target)?;
        self.emit(
            Operator::Assign,
            Operand::Symbol(falsehood),
            Operand::Null,
            Operand::Symbol(place),
        );
        Ok(Operand::Symbol(place))
    }
}
