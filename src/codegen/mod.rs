//! Final code generation.
//!
//! Each flushed unit is lowered quad by quad to 16-bit MASM assembly. This
//! module handles:
//!
//! - Load, load-address and store for every operand kind
//! - Access to outer-scope entities through static-link chains
//! - The calling convention and the static link pushed for each callee
//! - Pooling of string literals and collection of library externs
//! - Garbage collector call tables and the program skeleton

pub mod access;
pub mod codegen;
pub mod gc;
pub mod strings;
