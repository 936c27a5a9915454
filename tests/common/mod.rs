//! Model builders shared by the integration tests.

#![allow(dead_code)]

use refminer_core::{
    Attribute, Class, DiffConfig, Invocation, ModelDiff, Operation, OperationBody, RefactoringKind, RenameHints,
    Statement, StructuralModel, diff_models,
};

/// Plain statement invoking `name(args)` on no receiver.
pub fn call(name: &str, args: &[&str]) -> Statement {
    let text = format!("{}({})", name, args.join(", "));
    Statement::new(&text).uses(args).invokes(Invocation::new(None, name, args))
}

pub fn body(statements: Vec<Statement>) -> OperationBody {
    OperationBody::new(statements)
}

/// A class with one `id : Int` attribute and a `load()` operation, enough
/// for the identical member condition to have something to compare.
pub fn entity(package: &str, name: &str, file: &str) -> Class {
    Class::new(package, name, file)
        .with_attribute(Attribute::new("id", "Int"))
        .with_operation(Operation::new("load").with_return("Unit").with_body(body(vec![call("fetch", &["id"])])))
}

/// Operation whose body is worth mapping: three distinct calls.
pub fn greet() -> Operation {
    Operation::new("greet").with_parameter("name", "String").with_body(body(vec![
        call("check", &["name"]),
        call("format", &["name"]),
        call("println", &["name"]),
    ]))
}

pub fn diff<'a>(before: &'a StructuralModel, after: &'a StructuralModel) -> ModelDiff<'a> {
    diff_with(before, after, &RenameHints::new(), &DiffConfig::default())
}

pub fn diff_with<'a>(
    before: &'a StructuralModel,
    after: &'a StructuralModel,
    hints: &RenameHints,
    config: &DiffConfig,
) -> ModelDiff<'a> {
    diff_models(before, after, hints, config).expect("diff should succeed")
}

pub fn kinds(diff: &ModelDiff<'_>) -> Vec<RefactoringKind> {
    diff.refactorings.iter().map(|r| r.kind).collect()
}

pub fn descriptions(diff: &ModelDiff<'_>) -> Vec<String> {
    diff.refactorings.iter().map(|r| r.description.clone()).collect()
}
