//! diff.rs
//! Diff two structural models of one codebase and classify what changed.
//!
//! Order of work:
//! - set-difference classes by identity and member-diff the common ones;
//! - pair leftovers through the matcher chain (move, rename, relaxed rename,
//!   then the opt-in extremely relaxed matchers);
//! - diff inheritance edges, with child names mapped through the matches;
//! - diff package-level files;
//! - aggregate class-level refactorings and operations moved between classes.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::body_mapper::BodyMapper;
use crate::class_matcher::ClassMatcher;
use crate::config::DiffConfig;
use crate::error::{Deadline, MinerError, Result};
use crate::member_diff::{ClassDiff, FileDiff, MemberDiff, method_range};
use crate::model::{Class, ClassKind, Generalization, Operation, Realization, StructuralModel, last_segment};
use crate::refactoring::{Refactoring, RefactoringKind};
use crate::similarity::rename_pattern;

/// Old file path -> new file path, as reported by version control.
pub type RenameHints = HashMap<String, String>;

/// Same child, different superclass (after qualifier stripping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralizationDiff {
    pub child: String,
    pub removed_parent: String,
    pub added_parent: String,
}

/// A removed/added class pair accepted by a move-family matcher.
pub struct ClassMoveDiff<'a> {
    pub matcher: ClassMatcher,
    pub diff: ClassDiff<'a>,
}

/// A removed/added class pair accepted by a rename-family matcher.
pub struct ClassRenameDiff<'a> {
    pub matcher: ClassMatcher,
    pub diff: ClassDiff<'a>,
}

#[derive(Default)]
pub struct ModelDiff<'a> {
    pub refactorings: Vec<Refactoring>,
    pub removed_classes: Vec<&'a Class>,
    pub added_classes: Vec<&'a Class>,
    pub common_class_diffs: Vec<ClassDiff<'a>>,
    pub class_move_diffs: Vec<ClassMoveDiff<'a>>,
    pub class_rename_diffs: Vec<ClassRenameDiff<'a>>,
    pub generalization_diffs: Vec<GeneralizationDiff>,
    pub removed_generalizations: Vec<&'a Generalization>,
    pub added_generalizations: Vec<&'a Generalization>,
    pub removed_realizations: Vec<&'a Realization>,
    pub added_realizations: Vec<&'a Realization>,
    pub file_diffs: Vec<FileDiff<'a>>,
}

impl<'a> ModelDiff<'a> {
    pub fn removed_class_names(&self) -> Vec<String> {
        self.removed_classes.iter().map(|c| c.qualified_name()).collect()
    }

    pub fn added_class_names(&self) -> Vec<String> {
        self.added_classes.iter().map(|c| c.qualified_name()).collect()
    }

    /// (before, after) for every matched class pair.
    pub fn matched_classes(&self) -> Vec<(&'a Class, &'a Class)> {
        self.class_move_diffs
            .iter()
            .map(|m| (m.diff.original, m.diff.next))
            .chain(self.class_rename_diffs.iter().map(|r| (r.diff.original, r.diff.next)))
            .collect()
    }
}

type ClassKey = (String, ClassKind, String);

fn class_key(c: &Class) -> ClassKey {
    // qualified name + kind + file is the cross-revision identity
    (c.qualified_name(), c.kind, c.source_file.clone())
}

/// Inheritance edges that survive validation. Strict mode rejects the model
/// outright; lenient mode logs each issue and drops dangling edges.
fn checked_edges<'a>(
    model: &'a StructuralModel,
    side: &str,
    config: &DiffConfig,
) -> Result<(Vec<&'a Generalization>, Vec<&'a Realization>)> {
    let issues = model.validate();
    if !issues.is_empty() {
        if config.strict_validation {
            return Err(MinerError::InvalidModel(format!("{side} model: {}", issues.join("; "))));
        }
        for issue in &issues {
            warn!(side, %issue, "tolerating inconsistent model");
        }
    }
    let names: HashSet<String> = model.classes.iter().map(|c| c.qualified_name()).collect();
    let generalizations = model.generalizations.iter().filter(|g| names.contains(&g.child)).collect();
    let realizations = model.realizations.iter().filter(|r| names.contains(&r.class)).collect();
    Ok((generalizations, realizations))
}

/// Full diff of two revisions. Fails only on an invalid model (strict mode),
/// an invalid configuration, or when the configured time bound runs out.
pub fn diff_models<'a>(
    before: &'a StructuralModel,
    after: &'a StructuralModel,
    hints: &RenameHints,
    config: &DiffConfig,
) -> Result<ModelDiff<'a>> {
    config.validate()?;
    let deadline = Deadline::new(config.timeout());
    let (generalizations1, realizations1) = checked_edges(before, "before", config)?;
    let (generalizations2, realizations2) = checked_edges(after, "after", config)?;
    info!(before = before.classes.len(), after = after.classes.len(), "diffing structural models");

    let mut out = ModelDiff::default();

    // 1) identity set-difference, 2) common classes
    let index2: HashMap<ClassKey, &'a Class> = after.classes.iter().map(|c| (class_key(c), c)).collect();
    let keys1: HashSet<ClassKey> = before.classes.iter().map(class_key).collect();
    let mut removed = Vec::new();
    for c1 in &before.classes {
        deadline.check("common class diff")?;
        match index2.get(&class_key(c1)) {
            Some(&c2) => {
                let diff = ClassDiff::process(c1, c2, &deadline, config)?;
                if !diff.is_empty() {
                    out.common_class_diffs.push(diff);
                }
            }
            None => removed.push(c1),
        }
    }
    let mut added: Vec<&'a Class> = after.classes.iter().filter(|c| !keys1.contains(&class_key(c))).collect();

    // 3) matcher chain
    for matcher in &ClassMatcher::chain(config.extremely_relaxed_matching) {
        let mut i = 0;
        while i < removed.len() {
            deadline.check("class matching")?;
            let hint = hints.get(&removed[i].source_file).map(String::as_str);
            let Some(j) = matcher.select(removed[i], &added, hint, &removed) else {
                i += 1;
                continue;
            };
            let (original, next) = (removed.remove(i), added.remove(j));
            debug!(%matcher, before = %original.qualified_name(), after = %next.qualified_name(), "classes matched");
            let diff = ClassDiff::process(original, next, &deadline, config)?;
            // a relaxed rename that kept the simple name is still a move
            if matcher.is_move() || original.name == next.name {
                out.class_move_diffs.push(ClassMoveDiff { matcher: *matcher, diff });
            } else {
                out.class_rename_diffs.push(ClassRenameDiff { matcher: *matcher, diff });
            }
        }
    }

    // 4) inheritance edges, now that matches are known
    let renamed: HashMap<String, String> =
        out.matched_classes().iter().map(|(o, n)| (o.qualified_name(), n.qualified_name())).collect();
    diff_generalizations(&mut out, &generalizations1, &generalizations2, &renamed);
    diff_realizations(&mut out, &realizations1, &realizations2, &renamed);

    // 5) package-level files
    let files2: HashMap<&str, _> = after.files.iter().map(|f| (f.path.as_str(), f)).collect();
    for f1 in &before.files {
        deadline.check("file diff")?;
        if let Some(&f2) = files2.get(f1.path.as_str()) {
            let diff = FileDiff::process(f1, f2, &deadline, config)?;
            if !diff.is_empty() {
                out.file_diffs.push(diff);
            }
        }
    }

    let mut refactorings = class_level_refactorings(&out, after);
    refactorings.extend(extracted_supertypes(&added, &generalizations2, &realizations2, &keys1, &renamed, after));
    for diff in &out.common_class_diffs {
        refactorings.extend(diff.members.refactorings.iter().cloned());
    }
    for diff in out.class_move_diffs.iter().map(|m| &m.diff).chain(out.class_rename_diffs.iter().map(|r| &r.diff)) {
        refactorings.extend(diff.members.refactorings.iter().cloned());
    }
    for diff in &out.file_diffs {
        refactorings.extend(diff.members.refactorings.iter().cloned());
    }
    refactorings.extend(moved_operations(&mut out, &generalizations2, &deadline, config)?);

    // 6) leftovers
    out.removed_classes = removed;
    out.added_classes = added;
    out.refactorings = refactorings;
    info!(
        refactorings = out.refactorings.len(),
        removed = out.removed_classes.len(),
        added = out.added_classes.len(),
        "model diff complete"
    );
    Ok(out)
}

/// Convenience wrapper returning only the refactorings.
pub fn detect_refactorings(
    before: &StructuralModel,
    after: &StructuralModel,
    hints: &RenameHints,
    config: &DiffConfig,
) -> Result<Vec<Refactoring>> {
    Ok(diff_models(before, after, hints, config)?.refactorings)
}

fn diff_generalizations<'a>(
    out: &mut ModelDiff<'a>,
    before: &[&'a Generalization],
    after: &[&'a Generalization],
    renamed: &HashMap<String, String>,
) {
    let map = |name: &str| renamed.get(name).cloned().unwrap_or_else(|| name.to_string());
    let mapped: Vec<(Generalization, &'a Generalization)> =
        before.iter().map(|g| (Generalization::new(&map(&g.child), &map(&g.parent)), *g)).collect();

    let mut removed: Vec<&(Generalization, &'a Generalization)> =
        mapped.iter().filter(|(m, _)| !after.iter().any(|g2| *g2 == m)).collect();
    let mut added: Vec<&'a Generalization> =
        after.iter().copied().filter(|g2| !mapped.iter().any(|(m, _)| m == *g2)).collect();

    removed.retain(|(m, original)| match added.iter().position(|g2| g2.child == m.child) {
        Some(pos) => {
            let g2 = added.remove(pos);
            if !m.matches_ignoring_qualifier(g2) {
                out.generalization_diffs.push(GeneralizationDiff {
                    child: g2.child.clone(),
                    removed_parent: original.parent.clone(),
                    added_parent: g2.parent.clone(),
                });
            }
            false
        }
        None => true,
    });
    out.removed_generalizations = removed.into_iter().map(|(_, g)| *g).collect();
    out.added_generalizations = added;
}

fn diff_realizations<'a>(
    out: &mut ModelDiff<'a>,
    before: &[&'a Realization],
    after: &[&'a Realization],
    renamed: &HashMap<String, String>,
) {
    let map = |name: &str| renamed.get(name).cloned().unwrap_or_else(|| name.to_string());
    let mapped: Vec<(Realization, &'a Realization)> =
        before.iter().map(|r| (Realization::new(&map(&r.class), &map(&r.interface)), *r)).collect();

    let mut added: Vec<&'a Realization> = after.to_vec();
    let mut removed = Vec::new();
    for (m, original) in &mapped {
        let hit = added
            .iter()
            .position(|r2| *r2 == m)
            .or_else(|| added.iter().position(|r2| m.matches_ignoring_qualifier(r2)));
        match hit {
            Some(pos) => {
                added.remove(pos);
            }
            None => removed.push(*original),
        }
    }
    out.removed_realizations = removed;
    out.added_realizations = added;
}

fn type_range(c: &Class, description: &str) -> crate::location::CodeRange {
    c.location.code_range(description, c.qualified_name())
}

fn moved_with_outer(original: &Class, next: &Class, pairs: &[(&Class, &Class)]) -> bool {
    !original.is_top_level
        && pairs.iter().any(|(outer1, outer2)| original.is_inner_class_of(outer1) && next.is_inner_class_of(outer2))
}

/// Move/rename class, rename package and move source folder records.
fn class_level_refactorings(out: &ModelDiff<'_>, after: &StructuralModel) -> Vec<Refactoring> {
    let pairs = out.matched_classes();
    let mut found = Vec::new();
    let mut packages: BTreeMap<(String, String), Vec<(&Class, &Class)>> = BTreeMap::new();
    let mut folders: BTreeMap<(String, String), Vec<(&Class, &Class)>> = BTreeMap::new();

    for m in &out.class_move_diffs {
        let (original, next) = (m.diff.original, m.diff.next);
        if moved_with_outer(original, next, &pairs) {
            continue;
        }
        let (before_name, after_name) = (original.qualified_name(), next.qualified_name());
        if before_name == after_name {
            // a file moved within its source folder is not a refactoring
            let (from, to) = (original.source_folder(), next.source_folder());
            if from != to {
                folders.entry((from, to)).or_default().push((original, next));
            }
            continue;
        }
        found.push(
            Refactoring::new(RefactoringKind::MoveClass, format!("{} moved to {}", before_name, after_name))
                .left(type_range(original, "original type declaration"))
                .right(type_range(next, "moved type declaration"))
                .class_before(&original.source_file, &before_name)
                .class_after(&next.source_file, &after_name),
        );
        if original.is_top_level {
            packages.entry(rename_pattern('.', &before_name, &after_name)).or_default().push((original, next));
        }
    }

    for r in &out.class_rename_diffs {
        let (original, next) = (r.diff.original, r.diff.next);
        if moved_with_outer(original, next, &pairs) {
            continue;
        }
        let (before_name, after_name) = (original.qualified_name(), next.qualified_name());
        let (kind, detail) = if original.package == next.package {
            (RefactoringKind::RenameClass, format!("{} renamed to {}", before_name, after_name))
        } else {
            (RefactoringKind::MoveAndRenameClass, format!("{} moved and renamed to {}", before_name, after_name))
        };
        found.push(
            Refactoring::new(kind, detail)
                .left(type_range(original, "original type declaration"))
                .right(type_range(next, "renamed type declaration"))
                .class_before(&original.source_file, &before_name)
                .class_after(&next.source_file, &after_name),
        );
    }

    for ((from, to), moves) in packages {
        let folder_gone = !after.repository_directories.is_empty()
            && moves.iter().any(|(original, _)| !after.repository_directories.contains(&original.package_directory()));
        if moves.len() < 2 && !folder_gone {
            continue;
        }
        let (from, to) = (from.trim_end_matches('.'), to.trim_end_matches('.'));
        let mut r = Refactoring::new(RefactoringKind::RenamePackage, format!("{} to {}", from, to));
        for (original, next) in moves {
            r = r
                .left(type_range(original, "original type declaration"))
                .right(type_range(next, "moved type declaration"))
                .class_before(&original.source_file, &original.qualified_name())
                .class_after(&next.source_file, &next.qualified_name());
        }
        found.push(r);
    }

    for ((from, to), moves) in folders {
        let mut r = Refactoring::new(RefactoringKind::MoveSourceFolder, format!("{} to {}", from, to));
        for (original, next) in moves {
            r = r
                .left(type_range(original, "original type declaration"))
                .right(type_range(next, "moved type declaration"))
                .class_before(&original.source_file, &original.qualified_name())
                .class_after(&next.source_file, &next.qualified_name());
        }
        found.push(r);
    }
    found
}

/// Added classes that became the supertype of a class that already existed.
fn extracted_supertypes(
    added: &[&Class],
    generalizations: &[&Generalization],
    realizations: &[&Realization],
    keys_before: &HashSet<ClassKey>,
    renamed: &HashMap<String, String>,
    after: &StructuralModel,
) -> Vec<Refactoring> {
    let existed = |child: &str| {
        renamed.values().any(|n| n == child)
            || after.classes.iter().any(|c| c.qualified_name() == child && keys_before.contains(&class_key(c)))
    };
    fn refers_to(parent: &str, class: &Class) -> bool {
        parent == class.qualified_name() || parent == class.name
    }

    let mut found = Vec::new();
    for supertype in added {
        let children: Vec<&str> = generalizations
            .iter()
            .filter(|g| refers_to(&g.parent, supertype))
            .map(|g| g.child.as_str())
            .chain(realizations.iter().filter(|r| refers_to(&r.interface, supertype)).map(|r| r.class.as_str()))
            .filter(|child| existed(*child))
            .collect();
        if children.is_empty() {
            continue;
        }
        let kind =
            if supertype.is_interface() { RefactoringKind::ExtractInterface } else { RefactoringKind::ExtractSuperclass };
        let mut r = Refactoring::new(
            kind,
            format!("{} from classes [{}]", supertype.qualified_name(), children.join(", ")),
        )
        .right(type_range(supertype, "extracted type declaration"))
        .class_after(&supertype.source_file, &supertype.qualified_name());
        for child in children {
            if let Some(c) = after.find_class(child) {
                r = r.right(type_range(c, "sub-type declaration after extraction"));
            }
        }
        found.push(r);
    }
    found
}

/// Operations removed from one diffed class and added to another. A move
/// along a generalization of the after model is a pull-up or push-down.
fn moved_operations<'a>(
    out: &mut ModelDiff<'a>,
    generalizations: &[&Generalization],
    deadline: &Deadline,
    config: &DiffConfig,
) -> Result<Vec<Refactoring>> {
    let mut all: Vec<&mut MemberDiff<'a>> = out
        .common_class_diffs
        .iter_mut()
        .map(|d| &mut d.members)
        .chain(out.class_move_diffs.iter_mut().map(|m| &mut m.diff.members))
        .chain(out.class_rename_diffs.iter_mut().map(|r| &mut r.diff.members))
        .collect();
    let linked = |child: &str, parent: &str| {
        generalizations.iter().any(|g| g.child == child && last_segment(&g.parent) == last_segment(parent))
    };

    let mut found = Vec::new();
    let mut moves: Vec<(usize, &'a Operation, usize, &'a Operation)> = Vec::new(); // (source diff, removed op, target diff, added op)
    for (si, source) in all.iter().enumerate() {
        for &op1 in &source.removed_operations {
            for (ti, target) in all.iter().enumerate() {
                if si == ti {
                    continue;
                }
                for &op2 in &target.added_operations {
                    if !op1.same_signature(op2) || moves.iter().any(|(_, _, _, taken)| std::ptr::eq(*taken, op2)) {
                        continue;
                    }
                    deadline.check("operation move detection")?;
                    let mapper = BodyMapper::new(op1, op2, deadline, config)?;
                    if !mapper.mapping_dominates() {
                        continue;
                    }
                    let kind = if linked(source.next_name.as_str(), target.next_name.as_str()) {
                        RefactoringKind::PullUpOperation
                    } else if linked(target.next_name.as_str(), source.next_name.as_str()) {
                        RefactoringKind::PushDownOperation
                    } else {
                        RefactoringKind::MoveOperation
                    };
                    debug!(%kind, from = %source.next_name, to = %target.next_name, operation = %op1.name, "operation moved");
                    found.push(
                        Refactoring::new(
                            kind,
                            format!("{} from class {} to {} from class {}", op1, source.next_name, op2, target.next_name),
                        )
                        .left(method_range(op1, "original method declaration"))
                        .right(method_range(op2, "moved method declaration"))
                        .class_before(&source.original_file, &source.original_name)
                        .class_after(&target.next_file, &target.next_name),
                    );
                    found.extend(mapper.variable_refactorings());
                    moves.push((si, op1, ti, op2));
                    break;
                }
                if moves.iter().any(|(_, taken, _, _)| std::ptr::eq(*taken, op1)) {
                    break;
                }
            }
        }
    }

    for (si, op1, ti, op2) in moves {
        all[si].removed_operations.retain(|op| !std::ptr::eq(*op, op1));
        all[ti].added_operations.retain(|op| !std::ptr::eq(*op, op2));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, Operation};

    fn foo(package: &str, name: &str, file: &str) -> Class {
        Class::new(package, name, file)
            .with_attribute(Attribute::new("id", "Int"))
            .with_operation(Operation::new("bar").with_return("Unit"))
    }

    fn run<'a>(before: &'a StructuralModel, after: &'a StructuralModel) -> ModelDiff<'a> {
        diff_models(before, after, &RenameHints::new(), &DiffConfig::default()).unwrap()
    }

    #[test]
    fn identical_models_have_no_changes() {
        let model = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]);
        let binding = model.clone();
        let d = run(&model, &binding);
        assert!(d.refactorings.is_empty());
        assert!(d.removed_classes.is_empty() && d.added_classes.is_empty());
        assert!(d.common_class_diffs.is_empty());
    }

    #[test]
    fn rename_in_same_file() {
        let before = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]);
        let after = StructuralModel::new(vec![foo("a", "Bar", "a/X.kt")]);
        let d = run(&before, &after);
        assert_eq!(d.refactorings.len(), 1);
        assert_eq!(d.refactorings[0].kind, RefactoringKind::RenameClass);
        assert_eq!(d.refactorings[0].description, "Rename Class\ta.Foo renamed to a.Bar");
        assert_eq!(d.class_rename_diffs[0].matcher, ClassMatcher::RENAME);
    }

    #[test]
    fn moves_sharing_a_pattern_rename_the_package() {
        let before = StructuralModel::new(vec![
            foo("com.old", "Foo", "src/com/old/Foo.kt"),
            foo("com.old", "Bar", "src/com/old/Bar.kt").with_operation(Operation::new("baz")),
        ]);
        let after = StructuralModel::new(vec![
            foo("com.fresh", "Foo", "src/com/fresh/Foo.kt"),
            foo("com.fresh", "Bar", "src/com/fresh/Bar.kt").with_operation(Operation::new("baz")),
        ]);
        let d = run(&before, &after);
        let kinds: Vec<_> = d.refactorings.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RefactoringKind::MoveClass, RefactoringKind::MoveClass, RefactoringKind::RenamePackage]);
        assert_eq!(d.refactorings[2].description, "Rename Package\tcom.old to com.fresh");
    }

    #[test]
    fn generalization_qualifier_churn_is_ignored() {
        let before = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]).with_generalization("a.Foo", "pkg1.Base");
        let after = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]).with_generalization("a.Foo", "pkg2.Base");
        let d = run(&before, &after);
        assert!(d.refactorings.is_empty());
        assert!(d.generalization_diffs.is_empty());
        assert!(d.removed_generalizations.is_empty() && d.added_generalizations.is_empty());
    }

    #[test]
    fn superclass_change_is_recorded() {
        let before = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]).with_generalization("a.Foo", "Base");
        let after = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]).with_generalization("a.Foo", "Other");
        let d = run(&before, &after);
        assert_eq!(
            d.generalization_diffs,
            vec![GeneralizationDiff { child: "a.Foo".into(), removed_parent: "Base".into(), added_parent: "Other".into() }]
        );
    }

    #[test]
    fn strict_validation_rejects_dangling_edge() {
        let before = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]).with_generalization("a.Ghost", "Base");
        let after = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]);
        let err = diff_models(&before, &after, &RenameHints::new(), &DiffConfig::default());
        assert!(matches!(err, Err(MinerError::InvalidModel(_))));

        let lenient = DiffConfig { strict_validation: false, ..DiffConfig::default() };
        let d = diff_models(&before, &after, &RenameHints::new(), &lenient).unwrap();
        assert!(d.removed_generalizations.is_empty());
    }

    #[test]
    fn zero_timeout_fails_with_timed_out() {
        let model = StructuralModel::new(vec![foo("a", "Foo", "a/X.kt")]);
        let config = DiffConfig { timeout_ms: Some(0), ..DiffConfig::default() };
        let err = diff_models(&model, &model, &RenameHints::new(), &config);
        assert!(matches!(err, Err(MinerError::TimedOut { .. })));
    }
}
