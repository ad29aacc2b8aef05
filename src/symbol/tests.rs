//! Unit tests for the symbol table.
//!
//! This module contains tests for scopes, frame layout, constant
//! deduplication and forward declarations.

use crate::types::types::Type;

use super::{
    entry::{ConstValue, EntryKind, PassMode, SignatureState},
    library::{library_function, LIBRARY_FUNCTIONS},
    symbol::{LookupPolicy, SymbolTable, START_NEGATIVE_OFFSET, START_POSITIVE_OFFSET},
};

fn table_with_scopes(levels: u32) -> SymbolTable {
    let mut table = SymbolTable::new();
    for _ in 0..levels {
        table.open_scope();
    }
    table
}

#[test]
fn test_nesting_levels() {
    let mut table = SymbolTable::new();
    assert_eq!(table.nesting_level(), 0);
    table.open_scope();
    assert_eq!(table.nesting_level(), 1);
    table.open_scope();
    assert_eq!(table.nesting_level(), 2);
    table.close_scope().unwrap();
    assert_eq!(table.nesting_level(), 1);
}

#[test]
fn test_close_without_scope_is_internal() {
    let mut table = SymbolTable::new();
    let error = table.close_scope().unwrap_err();
    assert_eq!(error.get_error_name(), "Internal");
}

#[test]
fn test_local_offset_in_function_scope() {
    let mut table = table_with_scopes(2);
    let x = table.declare_variable("x", Type::Integer).unwrap();

    let entry = table.entry(x);
    assert_eq!(entry.nesting_level, 2);
    assert_eq!(entry.offset(), Some(START_NEGATIVE_OFFSET - 2));
}

#[test]
fn test_offsets_decrease_by_size() {
    let mut table = table_with_scopes(1);
    let a = table.declare_variable("a", Type::Char).unwrap();
    let b = table.declare_variable("b", Type::Integer).unwrap();
    let t = table.declare_temporary(Type::Boolean).unwrap();
    let l = table.declare_variable("l", Type::list(Type::Integer)).unwrap();

    assert_eq!(table.entry(a).offset(), Some(-1));
    assert_eq!(table.entry(b).offset(), Some(-3));
    assert_eq!(table.entry(t).offset(), Some(-4));
    assert_eq!(table.entry(l).offset(), Some(-6));
    assert_eq!(table.current_scope().unwrap().neg_offset, -6);
}

#[test]
fn test_temporaries_are_auto_named() {
    let mut table = table_with_scopes(1);
    let first = table.declare_temporary(Type::Integer).unwrap();
    let second = table.declare_temporary(Type::Integer).unwrap();

    assert_eq!(table.entry(first).name, "$1");
    assert_eq!(table.entry(second).name, "$2");
    assert!(table.entry(first).is_temporary());
}

#[test]
fn test_duplicate_identifier_does_not_overwrite() {
    let mut table = table_with_scopes(1);
    let x = table.declare_variable("x", Type::Integer).unwrap();

    let error = table.declare_variable("x", Type::Char).unwrap_err();
    assert_eq!(error.get_error_name(), "DuplicateIdentifier");
    assert_eq!(table.lookup("x", LookupPolicy::CurrentScopeOnly), Some(x));
    assert_eq!(table.entry(x).ty(), Some(&Type::Integer));
    assert_eq!(table.current_scope().unwrap().neg_offset, -2);
}

#[test]
fn test_shadowing_and_lookup_policies() {
    let mut table = table_with_scopes(1);
    let outer = table.declare_variable("x", Type::Integer).unwrap();
    table.open_scope();

    assert_eq!(table.lookup("x", LookupPolicy::CurrentScopeOnly), None);
    assert_eq!(table.lookup("x", LookupPolicy::AllEnclosingScopes), Some(outer));

    let inner = table.declare_variable("x", Type::Char).unwrap();
    assert_eq!(table.lookup("x", LookupPolicy::CurrentScopeOnly), Some(inner));

    table.close_scope().unwrap();
    assert_eq!(table.lookup("x", LookupPolicy::AllEnclosingScopes), Some(outer));
    assert_eq!(table.entry(inner).name, "x");
}

#[test]
fn test_resolve_unknown_identifier() {
    let table = table_with_scopes(1);
    let error = table.resolve("missing").unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownIdentifier");
}

#[test]
fn test_constant_deduplication() {
    let mut table = table_with_scopes(1);
    let first = table
        .declare_constant(None, Type::Integer, ConstValue::Integer(7))
        .unwrap();
    let second = table
        .declare_constant(None, Type::Integer, ConstValue::Integer(7))
        .unwrap();
    let other = table
        .declare_constant(None, Type::Integer, ConstValue::Integer(8))
        .unwrap();

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert_eq!(table.entry(first).name, "7");
}

#[test]
fn test_constant_visible_from_inner_scope_is_reused() {
    let mut table = table_with_scopes(1);
    let outer = table
        .declare_constant(Some("true"), Type::Boolean, ConstValue::Boolean(true))
        .unwrap();
    table.open_scope();
    let inner = table
        .declare_constant(None, Type::Boolean, ConstValue::Boolean(true))
        .unwrap();
    assert_eq!(outer, inner);
}

#[test]
fn test_constant_printed_names() {
    let mut table = table_with_scopes(1);
    let c = table
        .declare_constant(None, Type::Char, ConstValue::Char(b'\n'))
        .unwrap();
    let s = table
        .declare_constant(
            None,
            Type::array(Type::Char),
            ConstValue::String(b"hi\t\"you\"".to_vec()),
        )
        .unwrap();

    assert_eq!(table.entry(c).name, "'\\n'");
    assert_eq!(table.entry(s).name, "\"hi\\t\\\"you\\\"\"");
}

#[test]
fn test_high_byte_constants_print_as_one_escape() {
    let mut table = table_with_scopes(1);
    let c = table
        .declare_constant(None, Type::Char, ConstValue::Char(0xff))
        .unwrap();
    let s = table
        .declare_constant(None, Type::array(Type::Char), ConstValue::String(vec![0xff]))
        .unwrap();

    assert_eq!(table.entry(c).name, "'\\xff'");
    assert_eq!(table.entry(s).name, "\"\\xff\"");
}

#[test]
fn test_invalid_constants() {
    let mut table = table_with_scopes(1);
    assert!(table
        .declare_constant(Some("empty"), Type::list(Type::Any), ConstValue::Nil)
        .is_err());
    assert!(table
        .declare_constant(None, Type::Integer, ConstValue::Boolean(true))
        .is_err());
    assert!(table
        .declare_constant(None, Type::list(Type::Any), ConstValue::Nil)
        .is_ok());
}

#[test]
fn test_parameter_offsets_tail_to_head() {
    let mut table = table_with_scopes(1);
    let f = table.declare_function("f").unwrap();
    table.open_scope();
    let a = table
        .declare_parameter("a", Type::Integer, PassMode::ByValue, f)
        .unwrap();
    let b = table
        .declare_parameter("b", Type::Char, PassMode::ByValue, f)
        .unwrap();
    let c = table
        .declare_parameter("c", Type::Char, PassMode::ByReference, f)
        .unwrap();
    table.finalize_signature(f, Type::Void).unwrap();

    assert_eq!(table.entry(c).offset(), Some(START_POSITIVE_OFFSET));
    assert_eq!(table.entry(b).offset(), Some(START_POSITIVE_OFFSET + 2));
    assert_eq!(table.entry(a).offset(), Some(START_POSITIVE_OFFSET + 3));

    let info = table.function(f).unwrap();
    assert_eq!(info.params_size, 5);
    assert_eq!(info.state, SignatureState::Complete);
    assert_eq!(table.parameters_of(f).unwrap(), vec![a, b, c]);
}

#[test]
fn test_only_cons_routines_export_call_tables() {
    let exporting: Vec<&str> = LIBRARY_FUNCTIONS
        .iter()
        .filter(|routine| routine.exports_call_table)
        .map(|routine| routine.name)
        .collect();
    assert_eq!(exporting, vec!["consv", "consp"]);

    let newarrv = library_function("newarrv").unwrap();
    assert!(newarrv.gc_hungry);
    assert!(!newarrv.exports_call_table);
    assert!(library_function("main").is_none());
}

#[test]
fn test_user_and_library_serials() {
    let mut table = table_with_scopes(1);
    table.declare_library().unwrap();

    let puti = table.resolve("puti").unwrap();
    let first_library = table.resolve(LIBRARY_FUNCTIONS[0].name).unwrap();
    assert!(table.function(puti).unwrap().is_library());
    assert_eq!(
        table.function(first_library).unwrap().serial,
        -(LIBRARY_FUNCTIONS.len() as i32)
    );
    assert!(table.function(table.resolve("consv").unwrap()).unwrap().gc_hungry);

    let main = table.declare_function("main").unwrap();
    table.open_scope();
    table.finalize_signature(main, Type::Void).unwrap();
    let helper = table.declare_function("helper").unwrap();
    table.finalize_signature(helper, Type::Integer).unwrap();

    assert_eq!(table.function(main).unwrap().serial, 0);
    assert_eq!(table.function(helper).unwrap().serial, 1);
    assert!(!table.function(main).unwrap().is_library());
}

fn forward_declare(table: &mut SymbolTable) -> crate::symbol::entry::EntryId {
    let f = table.declare_function("f").unwrap();
    table.mark_forward(f).unwrap();
    table.open_scope();
    table
        .declare_parameter("n", Type::Integer, PassMode::ByValue, f)
        .unwrap();
    table.finalize_signature(f, Type::Integer).unwrap();
    table.close_scope().unwrap();
    f
}

#[test]
fn test_forward_declaration_then_matching_definition() {
    let mut table = table_with_scopes(1);
    let f = forward_declare(&mut table);

    let again = table.declare_function("f").unwrap();
    assert_eq!(f, again);
    assert_eq!(table.function(f).unwrap().state, SignatureState::Checking);

    table.open_scope();
    let n = table
        .declare_parameter("n", Type::Integer, PassMode::ByValue, f)
        .unwrap();
    table.finalize_signature(f, Type::Integer).unwrap();

    assert_eq!(table.lookup("n", LookupPolicy::CurrentScopeOnly), Some(n));
    assert_eq!(table.entry(n).offset(), Some(START_POSITIVE_OFFSET));
    assert_eq!(table.function(f).unwrap().serial, 0);
}

#[test]
fn test_forward_declaration_parameter_type_mismatch() {
    let mut table = table_with_scopes(1);
    let f = forward_declare(&mut table);

    table.declare_function("f").unwrap();
    table.open_scope();
    let error = table
        .declare_parameter("n", Type::Char, PassMode::ByValue, f)
        .unwrap_err();
    assert_eq!(error.get_error_name(), "SignatureMismatch");
}

#[test]
fn test_forward_declaration_mode_and_count_mismatch() {
    let mut table = table_with_scopes(1);
    let f = forward_declare(&mut table);

    table.declare_function("f").unwrap();
    table.open_scope();
    let error = table
        .declare_parameter("n", Type::Integer, PassMode::ByReference, f)
        .unwrap_err();
    assert_eq!(error.get_error_name(), "SignatureMismatch");

    let error = table.finalize_signature(f, Type::Integer).unwrap_err();
    assert_eq!(error.get_error_name(), "SignatureMismatch");
}

#[test]
fn test_forward_declaration_result_mismatch() {
    let mut table = table_with_scopes(1);
    let f = forward_declare(&mut table);

    table.declare_function("f").unwrap();
    table.open_scope();
    table
        .declare_parameter("n", Type::Integer, PassMode::ByValue, f)
        .unwrap();
    let error = table.finalize_signature(f, Type::Boolean).unwrap_err();
    assert_eq!(error.get_error_name(), "SignatureMismatch");
}

#[test]
fn test_redefinition_without_forward_is_duplicate() {
    let mut table = table_with_scopes(1);
    let f = table.declare_function("f").unwrap();
    table.finalize_signature(f, Type::Void).unwrap();

    let error = table.declare_function("f").unwrap_err();
    assert_eq!(error.get_error_name(), "DuplicateIdentifier");
}

#[test]
fn test_parameter_after_complete_is_fatal() {
    let mut table = table_with_scopes(1);
    let f = table.declare_function("f").unwrap();
    table.finalize_signature(f, Type::Void).unwrap();

    let error = table
        .declare_parameter("late", Type::Integer, PassMode::ByValue, f)
        .unwrap_err();
    assert_eq!(error.get_error_name(), "FunctionAlreadyComplete");
    assert!(table.finalize_signature(f, Type::Void).is_err());
}

#[test]
fn test_frame_size_and_gc_flags() {
    let mut table = table_with_scopes(1);
    let f = table.declare_function("f").unwrap();
    table.finalize_signature(f, Type::Void).unwrap();
    table.open_scope();
    table.declare_variable("n", Type::Integer).unwrap();
    assert!(!table.current_scope().unwrap().gc_hungry);
    table.declare_variable("l", Type::list(Type::Integer)).unwrap();
    assert!(table.current_scope().unwrap().gc_hungry);

    table.record_frame_size(f).unwrap();
    table.mark_gc_hungry(f).unwrap();
    let info = table.function(f).unwrap();
    assert_eq!(info.frame_size, 4);
    assert!(info.gc_hungry);

    let n = table.resolve("n").unwrap();
    assert!(table.mark_gc_hungry(n).is_err());
    assert!(matches!(table.entry(n).kind, EntryKind::Variable { .. }));
}
