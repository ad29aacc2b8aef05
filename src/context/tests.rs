//! Unit tests for the compilation context.

use crate::{
    intermediate::{
        operand::{Operand, Passing},
        quad::Operator,
    },
    symbol::entry::{ConstValue, EntryId, PassMode},
    types::types::Type,
};

use super::{
    context::CompilationContext,
    options::CompilerOptions,
};

fn context(options: CompilerOptions) -> CompilationContext {
    CompilationContext::new(options.with_file("prog.tony")).unwrap()
}

fn declare_procedure(context: &mut CompilationContext, name: &str) -> EntryId {
    let function = context.declare_function(name).unwrap();
    context.open_scope();
    context.finalize_signature(function, Type::Void).unwrap();
    function
}

#[test]
fn test_default_options() {
    let options = CompilerOptions::default();
    assert!(!options.optimize);
    assert!(options.gc);
    assert_eq!(options.file.as_str(), "<stdin>");

    let options = CompilerOptions::new().with_optimize(true).with_gc(false);
    assert!(options.optimize);
    assert!(!options.gc);
}

#[test]
fn test_library_is_declared() {
    let context = context(CompilerOptions::default());
    assert_eq!(context.symbols().nesting_level(), 1);
    assert!(context.resolve("puti").is_ok());
    assert!(context.resolve("strcat").is_ok());
}

#[test]
fn test_errors_carry_position() {
    let mut context = context(CompilerOptions::default());
    context.open_scope();
    context.declare_variable("x", Type::Integer).unwrap();
    context.set_position(12);

    let error = context.declare_variable("x", Type::Char).unwrap_err();
    assert_eq!(error.get_position().0, 12);
    assert_eq!(
        error.to_string(),
        "prog.tony:12: Semantic error, duplicate identifier: x"
    );
    assert_eq!(error.exit_code(), 2);
}

#[test]
fn test_end_unit_flushes_dump_and_assembly() {
    let mut context = context(CompilerOptions::default().with_optimize(true));
    let main = declare_procedure(&mut context, "main");
    let x = context.declare_variable("x", Type::Integer).unwrap();

    context.begin_unit(main).unwrap();
    let one = context
        .declare_constant(None, Type::Integer, ConstValue::Integer(1))
        .unwrap();
    let t = context.declare_temporary(Type::Integer).unwrap();
    context
        .emit(Operator::Add, Operand::Symbol(one), Operand::Symbol(one), Operand::Symbol(t))
        .unwrap();
    context
        .emit(Operator::Assign, Operand::Symbol(t), Operand::Null, Operand::Symbol(x))
        .unwrap();
    context.end_unit(main).unwrap();

    assert_eq!(
        context.intermediate(),
        "1: unit, main, -, -\n2: :=, 2, -, x\n4: endu, main, -, -\n"
    );
    assert_eq!(context.symbols().function(main).unwrap().frame_size, 4);
    assert!(context.quads().pending().is_empty());
    context.close_scope().unwrap();

    let output = context.finish(main).unwrap();
    assert!(output.assembly.contains("\tmov\tword ptr [bp-2], bx\n"));
    assert!(output.assembly.contains("\tcall\tnear ptr _main_0\n"));
}

#[test]
fn test_end_unit_without_begin_is_internal() {
    let mut context = context(CompilerOptions::default());
    let main = declare_procedure(&mut context, "main");
    let error = context.end_unit(main).unwrap_err();
    assert_eq!(error.get_error_name(), "Internal");
}

#[test]
fn test_finish_with_open_unit_is_internal() {
    let mut context = context(CompilerOptions::default());
    let main = declare_procedure(&mut context, "main");
    context.begin_unit(main).unwrap();
    assert!(context.finish(main).is_err());
}

#[test]
fn test_gc_hunger_propagates_to_callers() {
    let mut context = context(CompilerOptions::default());
    let main = declare_procedure(&mut context, "main");
    let build = declare_procedure(&mut context, "build");
    let list = context.declare_variable("l", Type::list(Type::Integer)).unwrap();
    let consv = context.resolve("consv").unwrap();

    context.begin_unit(build).unwrap();
    context
        .emit(
            Operator::Par,
            Operand::Symbol(list),
            Operand::Pass(Passing::Result),
            Operand::Null,
        )
        .unwrap();
    context
        .emit(Operator::Call, Operand::Null, Operand::Null, Operand::Unit(consv))
        .unwrap();
    context.end_unit(build).unwrap();
    context.close_scope().unwrap();
    assert!(context.symbols().function(build).unwrap().gc_hungry);

    context.begin_unit(main).unwrap();
    context
        .emit(Operator::Call, Operand::Null, Operand::Null, Operand::Unit(build))
        .unwrap();
    context.end_unit(main).unwrap();
    context.close_scope().unwrap();
    assert!(context.symbols().function(main).unwrap().gc_hungry);

    let output = context.finish(main).unwrap();
    assert!(output.assembly.contains("_build_1_call_table:\n"));
    assert!(output.assembly.contains("_main_0_call_table:\n"));
    assert!(output.assembly.contains("\tmov\tax, OFFSET _build_1_call_table\n"));
}

#[test]
fn test_gc_disabled_does_not_propagate() {
    let mut context = context(CompilerOptions::default().with_gc(false));
    let main = declare_procedure(&mut context, "main");
    let consv = context.resolve("consv").unwrap();

    context.begin_unit(main).unwrap();
    context
        .emit(Operator::Call, Operand::Null, Operand::Null, Operand::Unit(consv))
        .unwrap();
    context.end_unit(main).unwrap();
    assert!(!context.symbols().function(main).unwrap().gc_hungry);
}

#[test]
fn test_forward_declaration_through_context() {
    let mut context = context(CompilerOptions::default());
    let f = context.declare_function("f").unwrap();
    context.mark_forward(f).unwrap();
    context.open_scope();
    context
        .declare_parameter("n", Type::Integer, PassMode::ByValue, f)
        .unwrap();
    context.finalize_signature(f, Type::Integer).unwrap();
    context.close_scope().unwrap();

    context.set_position(30);
    assert_eq!(context.declare_function("f").unwrap(), f);
    context.open_scope();
    let error = context
        .declare_parameter("n", Type::Boolean, PassMode::ByValue, f)
        .unwrap_err();
    assert_eq!(error.get_error_name(), "SignatureMismatch");
    assert_eq!(error.get_position().0, 30);
}
