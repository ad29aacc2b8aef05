//! The state of one compilation, driven by the parser in program order.
//!
//! A typical function goes through the context like this:
//!
//! ```ignore
//! let f = context.declare_function("f")?;
//! context.open_scope();
//! context.declare_parameter("n", Type::Integer, PassMode::ByValue, f)?;
//! context.finalize_signature(f, Type::Integer)?;
//! // locals and nested functions
//! context.begin_unit(f)?;
//! // body quads
//! context.end_unit(f)?;
//! context.close_scope()?;
//! ```

use log::info;

use crate::{
    codegen::codegen::CodeGenerator,
    errors::errors::Error,
    intermediate::{
        intermediate::{LabelList, QuadBuffer},
        operand::Operand,
        optimizer::optimize,
        quad::Operator,
    },
    symbol::{
        entry::{ConstValue, EntryId, PassMode},
        symbol::{LookupPolicy, SymbolTable},
    },
    types::types::Type,
    Position, MK_INTERNAL,
};

use super::options::CompilerOptions;

/// Text produced by a finished compilation.
#[derive(Debug, Clone)]
pub struct CompilationOutput {
    /// One `n: op, x, y, z` line per active quad, unit by unit.
    pub intermediate: String,
    pub assembly: String,
}

#[derive(Debug)]
pub struct CompilationContext {
    options: CompilerOptions,
    symbols: SymbolTable,
    quads: QuadBuffer,
    codegen: CodeGenerator,
    intermediate: String,
    position: Position,
    /// Units whose body is being emitted, innermost last.
    units: Vec<EntryId>,
}

impl CompilationContext {
    /// Opens the outermost scope and declares the run-time library in it.
    pub fn new(options: CompilerOptions) -> Result<Self, Error> {
        let mut symbols = SymbolTable::new();
        symbols.open_scope();
        symbols.declare_library()?;

        Ok(CompilationContext {
            position: Position(0, options.file.clone()),
            codegen: CodeGenerator::new(options.gc),
            options,
            symbols,
            quads: QuadBuffer::new(),
            intermediate: String::new(),
            units: vec![],
        })
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn quads(&self) -> &QuadBuffer {
        &self.quads
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Records the source line the parser is at; errors raised afterwards carry it.
    pub fn set_position(&mut self, line: u32) {
        self.position = Position(line, self.options.file.clone());
    }

    /// IR dump of every unit flushed so far.
    pub fn intermediate(&self) -> &str {
        &self.intermediate
    }

    pub fn open_scope(&mut self) {
        self.symbols.open_scope();
    }

    pub fn close_scope(&mut self) -> Result<(), Error> {
        self.symbols
            .close_scope()
            .map_err(|error| error.at(&self.position))
    }

    pub fn declare_variable(&mut self, name: &str, ty: Type) -> Result<EntryId, Error> {
        self.symbols
            .declare_variable(name, ty)
            .map_err(|error| error.at(&self.position))
    }

    pub fn declare_temporary(&mut self, ty: Type) -> Result<EntryId, Error> {
        self.symbols
            .declare_temporary(ty)
            .map_err(|error| error.at(&self.position))
    }

    pub fn declare_constant(
        &mut self,
        name: Option<&str>,
        ty: Type,
        value: ConstValue,
    ) -> Result<EntryId, Error> {
        self.symbols
            .declare_constant(name, ty, value)
            .map_err(|error| error.at(&self.position))
    }

    pub fn declare_function(&mut self, name: &str) -> Result<EntryId, Error> {
        self.symbols
            .declare_function(name)
            .map_err(|error| error.at(&self.position))
    }

    pub fn mark_forward(&mut self, function: EntryId) -> Result<(), Error> {
        self.symbols
            .mark_forward(function)
            .map_err(|error| error.at(&self.position))
    }

    pub fn declare_parameter(
        &mut self,
        name: &str,
        ty: Type,
        mode: PassMode,
        function: EntryId,
    ) -> Result<EntryId, Error> {
        self.symbols
            .declare_parameter(name, ty, mode, function)
            .map_err(|error| error.at(&self.position))
    }

    pub fn finalize_signature(&mut self, function: EntryId, result: Type) -> Result<(), Error> {
        self.symbols
            .finalize_signature(function, result)
            .map_err(|error| error.at(&self.position))
    }

    pub fn lookup(&self, name: &str, policy: LookupPolicy) -> Option<EntryId> {
        self.symbols.lookup(name, policy)
    }

    pub fn resolve(&self, name: &str) -> Result<EntryId, Error> {
        self.symbols
            .resolve(name)
            .map_err(|error| error.at(&self.position))
    }

    pub fn next_quad(&self) -> u32 {
        self.quads.next_quad()
    }

    /// Appends a quad.
    ///
    /// A call to an allocating function makes the unit being emitted allocate
    /// too, so that its own callers record their call sites.
    pub fn emit(&mut self, op: Operator, x: Operand, y: Operand, z: Operand) -> Result<u32, Error> {
        if op == Operator::Call && self.options.gc {
            let Operand::Unit(callee) = z else {
                return Err(MK_INTERNAL!("call: operand z must be a unit").at(&self.position));
            };
            let callee_allocates = self
                .symbols
                .function(callee)
                .map_err(|error| error.at(&self.position))?
                .gc_hungry;
            if let (true, Some(unit)) = (callee_allocates, self.units.last()) {
                self.symbols
                    .mark_gc_hungry(*unit)
                    .map_err(|error| error.at(&self.position))?;
            }
        }
        Ok(self.quads.emit(op, x, y, z))
    }

    pub fn backpatch(&mut self, list: &mut LabelList, target: u32) -> Result<(), Error> {
        self.quads
            .backpatch(list, target)
            .map_err(|error| error.at(&self.position))
    }

    pub fn begin_condition(&mut self, place: Operand) -> (LabelList, LabelList) {
        self.quads.begin_condition(place)
    }

    pub fn materialize_condition(
        &mut self,
        on_true: LabelList,
        on_false: LabelList,
    ) -> Result<Operand, Error> {
        self.quads
            .materialize_condition(&mut self.symbols, on_true, on_false)
            .map_err(|error| error.at(&self.position))
    }

    /// Emits the `unit` quad that opens the body of `function`.
    pub fn begin_unit(&mut self, function: EntryId) -> Result<u32, Error> {
        self.symbols
            .function(function)
            .map_err(|error| error.at(&self.position))?;
        self.units.push(function);
        self.emit(Operator::Unit, Operand::Unit(function), Operand::Null, Operand::Null)
    }

    /// Closes the body of `function` and flushes its quads.
    ///
    /// Must be called while the function's scope is still open: the frame
    /// size and the collector's roots are taken from it.
    pub fn end_unit(&mut self, function: EntryId) -> Result<(), Error> {
        self.flush_unit(function)
            .map_err(|error| error.at(&self.position))
    }

    fn flush_unit(&mut self, function: EntryId) -> Result<(), Error> {
        if self.units.last() != Some(&function) {
            return Err(MK_INTERNAL!(
                "endu: `{}` is not the unit being emitted",
                self.symbols.entry(function).name
            ));
        }
        self.symbols.record_frame_size(function)?;
        self.emit(Operator::Endu, Operand::Unit(function), Operand::Null, Operand::Null)?;
        self.units.pop();

        let range = self.quads.flush();
        if self.options.optimize {
            optimize(&mut self.quads, range.clone(), &mut self.symbols)?;
        }
        self.intermediate
            .push_str(&self.quads.dump_range(range.clone(), &self.symbols)?);
        self.codegen.lower(&self.quads, range.clone(), &self.symbols)?;

        info!(
            "flushed unit `{}`: quads {}..{}",
            self.symbols.entry(function).name,
            range.start,
            range.end
        );
        Ok(())
    }

    /// Wraps the lowered units in the program skeleton; `program` is the outermost unit.
    pub fn finish(self, program: EntryId) -> Result<CompilationOutput, Error> {
        if let Some(unit) = self.units.last() {
            return Err(MK_INTERNAL!(
                "unit `{}` was never closed",
                self.symbols.entry(*unit).name
            ));
        }
        if !self.quads.pending().is_empty() {
            return Err(MK_INTERNAL!("quads emitted outside of any unit"));
        }

        let assembly = self.codegen.finish(program, &self.symbols)?;
        info!(
            "compiled {} quads, {} string literals",
            self.quads.len(),
            self.codegen.strings().len()
        );
        Ok(CompilationOutput {
            intermediate: self.intermediate,
            assembly,
        })
    }
}
