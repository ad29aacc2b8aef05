//! Run-time library routines known to every program.
//!
//! The routines are declared in the outermost scope before any user code, in
//! the order below, so they draw the negative serial numbers that mark a
//! function as external. The routines the compiler calls on its own behalf
//! (allocation and list access) come first.

use lazy_static::lazy_static;

use crate::types::types::Type;

use super::entry::PassMode;

#[derive(Debug, Clone)]
pub struct LibraryFunction {
    pub name: &'static str,
    pub params: Vec<(&'static str, Type, PassMode)>,
    pub result: Type,
    /// Allocates on the collected heap, so callers must publish a call table.
    pub gc_hungry: bool,
    /// The run-time library publishes a call table of its own for this routine.
    pub exports_call_table: bool,
}

fn routine(
    name: &'static str,
    params: Vec<(&'static str, Type, PassMode)>,
    result: Type,
) -> LibraryFunction {
    LibraryFunction {
        name,
        params,
        result,
        gc_hungry: false,
        exports_call_table: false,
    }
}

fn allocator(
    name: &'static str,
    params: Vec<(&'static str, Type, PassMode)>,
    result: Type,
) -> LibraryFunction {
    LibraryFunction {
        gc_hungry: true,
        ..routine(name, params, result)
    }
}

lazy_static! {
    pub static ref LIBRARY_FUNCTIONS: Vec<LibraryFunction> = {
        use PassMode::ByValue;

        let string = || Type::array(Type::Char);
        vec![
            allocator(
                "newarrv",
                vec![("n", Type::Integer, ByValue), ("size", Type::Integer, ByValue)],
                Type::array(Type::Any),
            ),
            allocator(
                "newarrp",
                vec![("n", Type::Integer, ByValue), ("size", Type::Integer, ByValue)],
                Type::array(Type::Any),
            ),
            LibraryFunction {
                exports_call_table: true,
                ..allocator(
                    "consv",
                    vec![("h", Type::Integer, ByValue), ("t", Type::list(Type::Any), ByValue)],
                    Type::list(Type::Any),
                )
            },
            LibraryFunction {
                exports_call_table: true,
                ..allocator(
                    "consp",
                    vec![("h", Type::list(Type::Any), ByValue), ("t", Type::list(Type::Any), ByValue)],
                    Type::list(Type::Any),
                )
            },
            routine("head", vec![("l", Type::list(Type::Any), ByValue)], Type::Integer),
            routine("tail", vec![("l", Type::list(Type::Any), ByValue)], Type::list(Type::Any)),
            routine("puti", vec![("n", Type::Integer, ByValue)], Type::Void),
            routine("putb", vec![("b", Type::Boolean, ByValue)], Type::Void),
            routine("putc", vec![("c", Type::Char, ByValue)], Type::Void),
            routine("puts", vec![("s", string(), ByValue)], Type::Void),
            routine("geti", vec![], Type::Integer),
            routine("getb", vec![], Type::Boolean),
            routine("getc", vec![], Type::Char),
            routine(
                "gets",
                vec![("n", Type::Integer, ByValue), ("s", string(), ByValue)],
                Type::Void,
            ),
            routine("abs", vec![("n", Type::Integer, ByValue)], Type::Integer),
            routine("ord", vec![("c", Type::Char, ByValue)], Type::Integer),
            routine("chr", vec![("n", Type::Integer, ByValue)], Type::Char),
            routine("strlen", vec![("s", string(), ByValue)], Type::Integer),
            routine(
                "strcmp",
                vec![("s1", string(), ByValue), ("s2", string(), ByValue)],
                Type::Integer,
            ),
            routine(
                "strcpy",
                vec![("trg", string(), ByValue), ("src", string(), ByValue)],
                Type::Void,
            ),
            routine(
                "strcat",
                vec![("trg", string(), ByValue), ("src", string(), ByValue)],
                Type::Void,
            ),
        ]
    };
}

/// Looks a routine up by its source name.
pub fn library_function(name: &str) -> Option<&'static LibraryFunction> {
    LIBRARY_FUNCTIONS.iter().find(|function| function.name == name)
}
