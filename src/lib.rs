//! refminer_core: detects refactorings between two structural models of a
//! codebase, with the statement-level evidence that backs each one.

mod body;
mod body_mapper;
mod class_matcher;
mod config;
mod diff;
mod error;
mod location;
mod member_diff;
mod model;
mod refactoring;
mod replacement;
mod similarity;
mod statement_matcher;
mod types;

pub use body::{FlatStatement, Invocation, ObjectCreation, OperationBody, Statement, StatementKind, VariableDeclaration};
pub use body_mapper::{BodyMapper, StatementMapping};
pub use class_matcher::{ClassMatcher, MemberMatch, NameMatch};
pub use config::DiffConfig;
pub use diff::{ClassMoveDiff, ClassRenameDiff, GeneralizationDiff, ModelDiff, RenameHints, detect_refactorings, diff_models};
pub use error::{Deadline, MinerError, Result};
pub use location::{CodeElementType, CodeRange, LocationInfo};
pub use member_diff::{ClassDiff, FileDiff, MemberDiff};
pub use model::{
    Annotation, Attribute, Class, ClassKind, CompanionObject, Generalization, MemberContainer, Operation, Parameter,
    ParameterDirection, Realization, SourceFile, StructuralModel, TypeParameter, Visibility,
};
pub use refactoring::{ClassRef, Refactoring, RefactoringKind};
pub use replacement::{
    MergeVariableReplacement, MethodInvocationReplacement, Replacement, ReplacementDetail, ReplacementKind,
    ReplacementSet, SplitVariableRegistry, SplitVariableReplacement,
};
pub use similarity::{
    bounded_edit_distance, camel_case_tokens, common_prefix, common_suffix, contains_identifier, edit_distance,
    normalized_edit_distance, rename_pattern, replace_identifier, separator_pos_of_common_suffix,
};
pub use statement_matcher::{MatchContext, StatementMatcher};
pub use types::{CompositeType, FunctionType, LeafType, TypeKind, UmlType};

use std::path::Path;

/// Loads two model snapshots (JSON) and diffs them.
pub fn detect_refactorings_in_files(
    before: &Path,
    after: &Path,
    hints: &RenameHints,
    config: &DiffConfig,
) -> Result<Vec<Refactoring>> {
    // 1) Load
    let before = StructuralModel::load(before)?;
    let after = StructuralModel::load(after)?;

    // 2) Diff
    detect_refactorings(&before, &after, hints, config)
}
