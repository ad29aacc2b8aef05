//! Compilation context module.
//!
//! All mutable compiler state lives in a `CompilationContext` that the parser
//! threads through its actions. It owns the symbol table, the quad buffer and
//! the code generator, attaches source positions to errors, and flushes every
//! finished unit through the optimizer and the code generator.

pub mod context;
pub mod options;

#[cfg(test)]
mod tests;
