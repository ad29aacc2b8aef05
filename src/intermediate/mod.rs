//! Intermediate code module.
//!
//! Programs are lowered to a flat sequence of quads before any assembly is
//! produced. This module provides:
//!
//! - Operands and operators with their printable forms
//! - The append-only quad buffer and its flush marker
//! - Label lists and backpatching of deferred jump targets
//! - The short-circuit condition protocol (`begin_condition` / `materialize_condition`)
//! - A fixed set of peephole optimizations

pub mod intermediate;
pub mod operand;
pub mod optimizer;
pub mod quad;
