//! member_diff.rs
//! Member-level diff of two versions of one container: a class, or the
//! package-level declarations of a source file.
//!
//! Attributes pair by declaration, operations by signature. Operations
//! without a counterpart are then paired again (rename, changed signature)
//! through their body mappings, and whatever remains is checked as an
//! extracted or inlined operation of a mapped one.

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::body_mapper::BodyMapper;
use crate::config::DiffConfig;
use crate::error::{Deadline, Result};
use crate::location::CodeRange;
use crate::model::{Attribute, Class, MemberContainer, Operation, Parameter, SourceFile};
use crate::refactoring::{Refactoring, RefactoringKind};
use crate::replacement::ReplacementKind;
use crate::similarity::normalized_edit_distance;

pub struct MemberDiff<'a> {
    pub original_name: String,
    pub next_name: String,
    pub original_file: String,
    pub next_file: String,
    pub removed_attributes: Vec<&'a Attribute>,
    pub added_attributes: Vec<&'a Attribute>,
    pub removed_operations: Vec<&'a Operation>,
    pub added_operations: Vec<&'a Operation>,
    /// One per operation present on both sides (kept, renamed or re-signed).
    pub mappers: Vec<BodyMapper<'a>>,
    pub refactorings: Vec<Refactoring>,
}

pub struct ClassDiff<'a> {
    pub original: &'a Class,
    pub next: &'a Class,
    pub members: MemberDiff<'a>,
}

pub struct FileDiff<'a> {
    pub original: &'a SourceFile,
    pub next: &'a SourceFile,
    pub members: MemberDiff<'a>,
}

pub(crate) fn method_range(op: &Operation, description: &str) -> CodeRange {
    op.location.code_range(description, op.signature())
}

fn attribute_range(attribute: &Attribute, description: &str) -> CodeRange {
    attribute.location.code_range(description, attribute.to_string())
}

impl<'a> MemberDiff<'a> {
    pub fn process<C: MemberContainer>(
        original: &'a C,
        next: &'a C,
        deadline: &Deadline,
        config: &DiffConfig,
    ) -> Result<Self> {
        let mut diff = Self {
            original_name: original.container_name(),
            next_name: next.container_name(),
            original_file: original.file_path().to_string(),
            next_file: next.file_path().to_string(),
            removed_attributes: Vec::new(),
            added_attributes: Vec::new(),
            removed_operations: Vec::new(),
            added_operations: Vec::new(),
            mappers: Vec::new(),
            refactorings: Vec::new(),
        };
        diff.diff_attributes(original.attributes(), next.attributes());
        diff.diff_operations(original.operations(), next.operations(), deadline, config)?;
        diff.detect_extract_and_inline(deadline, config)?;
        diff.detect_attribute_renames();
        for mapper in &diff.mappers {
            diff.refactorings.extend(mapper.variable_refactorings());
        }
        debug!(
            container = %diff.next_name,
            refactorings = diff.refactorings.len(),
            removed_operations = diff.removed_operations.len(),
            added_operations = diff.added_operations.len(),
            "member diff done"
        );
        Ok(diff)
    }

    /// Nothing reported, nothing left over and every body mapped exactly.
    pub fn is_empty(&self) -> bool {
        self.refactorings.is_empty()
            && self.removed_attributes.is_empty()
            && self.added_attributes.is_empty()
            && self.removed_operations.is_empty()
            && self.added_operations.is_empty()
            && self.mappers.iter().all(|m| {
                m.non_mapped_leaves1.is_empty()
                    && m.non_mapped_leaves2.is_empty()
                    && m.non_mapped_inner_nodes1.is_empty()
                    && m.non_mapped_inner_nodes2.is_empty()
                    && m.mappings.iter().all(|s| s.is_exact())
            })
    }

    pub(crate) fn report(&self, kind: RefactoringKind, detail: impl fmt::Display) -> Refactoring {
        Refactoring::new(kind, detail)
            .class_before(&self.original_file, &self.original_name)
            .class_after(&self.next_file, &self.next_name)
    }

    fn diff_attributes(&mut self, attributes1: Vec<&'a Attribute>, attributes2: Vec<&'a Attribute>) {
        let mut removed: Vec<&'a Attribute> =
            attributes1.iter().copied().filter(|a| !attributes2.iter().any(|b| a.same_declaration(b))).collect();
        let mut added: Vec<&'a Attribute> =
            attributes2.iter().copied().filter(|b| !attributes1.iter().any(|a| a.same_declaration(b))).collect();

        // same name, different type or visibility
        let mut changed = Vec::new();
        removed.retain(|a| match added.iter().position(|b| b.name == a.name) {
            Some(pos) => {
                changed.push((*a, added.remove(pos)));
                false
            }
            None => true,
        });
        for (before, after) in changed {
            if before.ty.equals_qualified(&after.ty) {
                continue;
            }
            let r = self
                .report(RefactoringKind::ChangeAttributeType, format!("{} to {} in class {}", before, after, self.next_name))
                .left(attribute_range(before, "original attribute declaration"))
                .right(attribute_range(after, "changed-type attribute declaration"));
            self.refactorings.push(r);
        }
        self.removed_attributes = removed;
        self.added_attributes = added;
    }

    fn diff_operations(
        &mut self,
        operations1: Vec<&'a Operation>,
        operations2: Vec<&'a Operation>,
        deadline: &Deadline,
        config: &DiffConfig,
    ) -> Result<()> {
        let mut removed = Vec::new();
        let mut added: Vec<&'a Operation> =
            operations2.iter().copied().filter(|b| !operations1.iter().any(|a| a.same_signature(b))).collect();

        for &op1 in &operations1 {
            deadline.check("operation diff")?;
            match operations2.iter().copied().find(|op2| op1.same_signature(op2)) {
                Some(op2) => {
                    let mapper = BodyMapper::new(op1, op2, deadline, config)?;
                    self.signature_changes(op1, op2, &mapper);
                    self.mappers.push(mapper);
                }
                None => removed.push(op1),
            }
        }

        // pair leftovers: renamed, or same name with a changed signature
        let mut candidates = Vec::new();
        for (i, &r) in removed.iter().enumerate() {
            for (j, &a) in added.iter().enumerate() {
                deadline.check("operation pairing")?;
                let mapper = BodyMapper::new(r, a, deadline, config)?;
                if let Some(tier) = pairing_tier(r, a, &mapper, &removed, &added, config) {
                    candidates.push((tier, mapper.mappings.len(), normalized_edit_distance(&r.name, &a.name), i, j, mapper));
                }
            }
        }
        candidates.sort_by(|x, y| {
            x.0.cmp(&y.0).then(y.1.cmp(&x.1)).then(x.2.partial_cmp(&y.2).unwrap_or(std::cmp::Ordering::Equal))
        });

        let (mut paired1, mut paired2) = (BTreeSet::new(), BTreeSet::new());
        for (_, _, _, i, j, mapper) in candidates {
            if paired1.contains(&i) || paired2.contains(&j) {
                continue;
            }
            paired1.insert(i);
            paired2.insert(j);
            let (op1, op2) = (removed[i], added[j]);
            if op1.name != op2.name {
                debug!(before = %op1.name, after = %op2.name, container = %self.next_name, "operation renamed");
                let r = self
                    .report(RefactoringKind::RenameMethod, format!("{} renamed to {} in class {}", op1, op2, self.next_name))
                    .left(method_range(op1, "original method declaration"))
                    .right(method_range(op2, "renamed method declaration"));
                self.refactorings.push(r);
            }
            self.signature_changes(op1, op2, &mapper);
            self.mappers.push(mapper);
        }

        self.removed_operations =
            removed.into_iter().enumerate().filter(|(i, _)| !paired1.contains(i)).map(|(_, op)| op).collect();
        added = added.into_iter().enumerate().filter(|(j, _)| !paired2.contains(j)).map(|(_, op)| op).collect();
        self.added_operations = added;
        Ok(())
    }

    /// Parameter, return type and annotation changes between two versions
    /// of one operation.
    fn signature_changes(&mut self, op1: &Operation, op2: &Operation, mapper: &BodyMapper<'_>) {
        let in_method = format!("in method {} from class {}", op2, self.next_name);
        let params1: Vec<&Parameter> = op1.input_parameters().collect();
        let params2: Vec<&Parameter> = op2.input_parameters().collect();
        let names1: Vec<&str> = params1.iter().map(|p| p.name.as_str()).collect();
        let names2: Vec<&str> = params2.iter().map(|p| p.name.as_str()).collect();
        let set1: BTreeSet<&str> = names1.iter().copied().collect();
        let set2: BTreeSet<&str> = names2.iter().copied().collect();
        let mut found = Vec::new();

        if set1 == set2 && names1 != names2 {
            found.push(
                self.report(
                    RefactoringKind::ReorderParameter,
                    format!("[{}] to [{}] {}", names1.join(", "), names2.join(", "), in_method),
                )
                .left(method_range(op1, "original method declaration"))
                .right(method_range(op2, "method declaration with reordered parameters")),
            );
        }

        for p1 in &params1 {
            if let Some(p2) = params2.iter().find(|p| p.name == p1.name) {
                if !p1.ty.equals_qualified(&p2.ty) {
                    found.push(
                        self.report(RefactoringKind::ChangeParameterType, format!("{} to {} {}", p1, p2, in_method))
                            .left(method_range(op1, "original method declaration"))
                            .right(method_range(op2, "method declaration with changed parameter type")),
                    );
                }
            }
        }

        let evidence: BTreeSet<(&str, &str)> = mapper
            .replacements()
            .filter(|r| r.kind == ReplacementKind::VariableName)
            .map(|r| (r.before.as_str(), r.after.as_str()))
            .collect();
        let mut only1: Vec<(usize, &Parameter)> =
            params1.iter().copied().enumerate().filter(|(_, p)| !set2.contains(p.name.as_str())).collect();
        let mut only2: Vec<(usize, &Parameter)> =
            params2.iter().copied().enumerate().filter(|(_, p)| !set1.contains(p.name.as_str())).collect();
        let mut renamed = Vec::new();
        only1.retain(|(i, p1)| {
            let hit = only2
                .iter()
                .position(|(_, p2)| evidence.contains(&(p1.name.as_str(), p2.name.as_str())))
                .or_else(|| only2.iter().position(|(j, p2)| j == i && p1.ty == p2.ty));
            match hit {
                Some(pos) => {
                    renamed.push((*p1, only2.remove(pos).1));
                    false
                }
                None => true,
            }
        });

        for (p1, p2) in renamed {
            found.push(
                self.report(RefactoringKind::RenameParameter, format!("{} to {} {}", p1, p2, in_method))
                    .left(method_range(op1, "original method declaration"))
                    .right(method_range(op2, "method declaration with renamed parameter")),
            );
            if !p1.ty.equals_qualified(&p2.ty) {
                found.push(
                    self.report(RefactoringKind::ChangeParameterType, format!("{} to {} {}", p1, p2, in_method))
                        .left(method_range(op1, "original method declaration"))
                        .right(method_range(op2, "method declaration with changed parameter type")),
                );
            }
        }
        for (_, p) in only1 {
            found.push(
                self.report(RefactoringKind::RemoveParameter, format!("{} {}", p, in_method))
                    .left(method_range(op1, "original method declaration"))
                    .right(method_range(op2, "method declaration with removed parameter")),
            );
        }
        for (_, p) in only2 {
            found.push(
                self.report(RefactoringKind::AddParameter, format!("{} {}", p, in_method))
                    .left(method_range(op1, "original method declaration"))
                    .right(method_range(op2, "method declaration with added parameter")),
            );
        }

        if let (Some(r1), Some(r2)) = (op1.return_parameter(), op2.return_parameter()) {
            if !r1.ty.equals_qualified(&r2.ty) {
                found.push(
                    self.report(RefactoringKind::ChangeReturnType, format!("{} to {} {}", r1.ty, r2.ty, in_method))
                        .left(method_range(op1, "original method declaration"))
                        .right(method_range(op2, "method declaration with changed return type")),
                );
            }
        }

        for a1 in &op1.annotations {
            match op2.annotations.iter().find(|a2| a2.name == a1.name) {
                None => found.push(
                    self.report(RefactoringKind::RemoveMethodAnnotation, format!("{} {}", a1, in_method))
                        .left(method_range(op1, "original method declaration"))
                        .right(method_range(op2, "method declaration with removed annotation")),
                ),
                Some(a2) if a2.value != a1.value => found.push(
                    self.report(RefactoringKind::ModifyMethodAnnotation, format!("{} to {} {}", a1, a2, in_method))
                        .left(method_range(op1, "original method declaration"))
                        .right(method_range(op2, "method declaration with modified annotation")),
                ),
                Some(_) => {}
            }
        }
        for a2 in op2.annotations.iter().filter(|a2| !op1.annotations.iter().any(|a1| a1.name == a2.name)) {
            found.push(
                self.report(RefactoringKind::AddMethodAnnotation, format!("{} {}", a2, in_method))
                    .left(method_range(op1, "original method declaration"))
                    .right(method_range(op2, "method declaration with added annotation")),
            );
        }
        self.refactorings.extend(found);
    }

    /// Added operations newly called from a mapped body and built from its
    /// unmatched statements; removed operations whose calls vanished and
    /// whose statements reappear in the caller.
    fn detect_extract_and_inline(&mut self, deadline: &Deadline, config: &DiffConfig) -> Result<()> {
        let mut extracted = BTreeSet::new();
        let mut inlined = BTreeSet::new();
        let mut found = Vec::new();

        for parent in &self.mappers {
            for (idx, &candidate) in self.added_operations.iter().enumerate() {
                deadline.check("extract operation detection")?;
                if candidate.has_empty_body() || !parent.calls_in_body2(candidate) || parent.calls_in_body1(candidate) {
                    continue;
                }
                let child = BodyMapper::for_extracted(parent, candidate, deadline, config)?;
                if child.mappings.is_empty() || child.mappings.len() < child.non_mapped_leaves2.len() {
                    continue;
                }
                found.push(
                    self.report(
                        RefactoringKind::ExtractOperation,
                        format!("{} extracted from {} in class {}", candidate, parent.operation2, self.next_name),
                    )
                    .left(method_range(parent.operation1, "source method declaration before extraction"))
                    .right(method_range(candidate, "extracted method declaration"))
                    .right(method_range(parent.operation2, "source method declaration after extraction")),
                );
                extracted.insert(idx);
            }

            for (idx, &candidate) in self.removed_operations.iter().enumerate() {
                deadline.check("inline operation detection")?;
                if candidate.has_empty_body() || !parent.calls_in_body1(candidate) || parent.calls_in_body2(candidate) {
                    continue;
                }
                let child = BodyMapper::for_inlined(parent, candidate, deadline, config)?;
                if child.mappings.is_empty() || child.mappings.len() < child.non_mapped_leaves1.len() {
                    continue;
                }
                found.push(
                    self.report(
                        RefactoringKind::InlineOperation,
                        format!("{} inlined to {} in class {}", candidate, parent.operation2, self.next_name),
                    )
                    .left(method_range(candidate, "inlined method declaration"))
                    .left(method_range(parent.operation1, "target method declaration before inline"))
                    .right(method_range(parent.operation2, "target method declaration after inline")),
                );
                inlined.insert(idx);
            }
        }

        self.refactorings.extend(found);
        let mut idx = 0;
        self.added_operations.retain(|_| {
            idx += 1;
            !extracted.contains(&(idx - 1))
        });
        let mut idx = 0;
        self.removed_operations.retain(|_| {
            idx += 1;
            !inlined.contains(&(idx - 1))
        });
        Ok(())
    }

    /// Equal-typed removed/added attribute pairs, backed by a variable-name
    /// replacement in some body, or the only pair with equal initializers.
    fn detect_attribute_renames(&mut self) {
        let evidence: BTreeSet<(&str, &str)> = self
            .mappers
            .iter()
            .flat_map(|m| m.replacements())
            .filter(|r| r.kind == ReplacementKind::VariableName)
            .map(|r| (strip_this(&r.before), strip_this(&r.after)))
            .collect();

        let mut pairs = Vec::new();
        let (mut used1, mut used2) = (BTreeSet::new(), BTreeSet::new());
        for (i, a) in self.removed_attributes.iter().enumerate() {
            let hit = self.added_attributes.iter().enumerate().find(|(j, b)| {
                !used2.contains(j) && a.ty == b.ty && evidence.contains(&(a.name.as_str(), b.name.as_str()))
            });
            if let Some((j, _)) = hit {
                used1.insert(i);
                used2.insert(j);
                pairs.push((i, j));
            }
        }

        let mut same_init: Vec<(usize, usize)> = Vec::new();
        for (i, a) in self.removed_attributes.iter().enumerate() {
            if used1.contains(&i) || a.initializer.is_none() {
                continue;
            }
            for (j, b) in self.added_attributes.iter().enumerate() {
                if !used2.contains(&j) && a.ty == b.ty && a.initializer == b.initializer {
                    same_init.push((i, j));
                }
            }
        }
        for &(i, j) in &same_init {
            let unique = same_init.iter().filter(|(x, y)| *x == i || *y == j).count() == 1;
            if unique {
                used1.insert(i);
                used2.insert(j);
                pairs.push((i, j));
            }
        }

        for (i, j) in pairs {
            let (before, after) = (self.removed_attributes[i], self.added_attributes[j]);
            let r = self
                .report(RefactoringKind::RenameAttribute, format!("{} to {} in class {}", before, after, self.next_name))
                .left(attribute_range(before, "original attribute declaration"))
                .right(attribute_range(after, "renamed attribute declaration"));
            self.refactorings.push(r);
        }
        self.removed_attributes = self
            .removed_attributes
            .iter()
            .enumerate()
            .filter(|(i, _)| !used1.contains(i))
            .map(|(_, a)| *a)
            .collect();
        self.added_attributes =
            self.added_attributes.iter().enumerate().filter(|(j, _)| !used2.contains(j)).map(|(_, a)| *a).collect();
    }
}

fn strip_this(name: &str) -> &str {
    name.strip_prefix("this.").unwrap_or(name)
}

/// How confidently a removed and an added operation are one operation;
/// lower is better, `None` means unrelated.
fn pairing_tier(
    removed: &Operation,
    added: &Operation,
    mapper: &BodyMapper<'_>,
    all_removed: &[&Operation],
    all_added: &[&Operation],
    config: &DiffConfig,
) -> Option<u8> {
    let same_name = removed.name == added.name;
    let name_close = normalized_edit_distance(&removed.name, &added.name) <= config.max_operation_name_distance;
    let same_types = removed.equal_parameter_types(added) && removed.equal_return_parameter(added);
    let both_empty = removed.has_empty_body() && added.has_empty_body();

    if !same_name && removed.name.eq_ignore_ascii_case(&added.name) && same_types {
        return Some(0);
    }
    if same_name {
        let unique = all_removed.iter().filter(|o| o.name == removed.name).count() == 1
            && all_added.iter().filter(|o| o.name == added.name).count() == 1;
        return (mapper.mapping_dominates() || unique || both_empty).then_some(1);
    }
    if mapper.mapping_dominates() && (name_close || removed.equal_parameter_types(added)) {
        return Some(2);
    }
    (both_empty && name_close && same_types).then_some(3)
}

impl<'a> ClassDiff<'a> {
    pub fn process(original: &'a Class, next: &'a Class, deadline: &Deadline, config: &DiffConfig) -> Result<Self> {
        let mut members = MemberDiff::process(original, next, deadline, config)?;
        let qualified = next.qualified_name();
        let mut found = Vec::new();
        for a in original.annotations.iter().filter(|a| !next.annotations.contains(a)) {
            found.push(
                members
                    .report(RefactoringKind::RemoveClassAnnotation, format!("{} in class {}", a, qualified))
                    .left(original.location.code_range("original class declaration", original.qualified_name()))
                    .right(next.location.code_range("class declaration with removed annotation", qualified.clone())),
            );
        }
        for a in next.annotations.iter().filter(|a| !original.annotations.contains(a)) {
            found.push(
                members
                    .report(RefactoringKind::AddClassAnnotation, format!("{} in class {}", a, qualified))
                    .left(original.location.code_range("original class declaration", original.qualified_name()))
                    .right(next.location.code_range("class declaration with added annotation", qualified.clone())),
            );
        }
        members.refactorings.extend(found);
        Ok(Self { original, next, members })
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<'a> FileDiff<'a> {
    pub fn process(original: &'a SourceFile, next: &'a SourceFile, deadline: &Deadline, config: &DiffConfig) -> Result<Self> {
        let members = MemberDiff::process(original, next, deadline, config)?;
        Ok(Self { original, next, members })
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Invocation, OperationBody, Statement, VariableDeclaration};

    fn diff<'a>(a: &'a Class, b: &'a Class) -> ClassDiff<'a> {
        ClassDiff::process(a, b, &Deadline::unbounded(), &DiffConfig::default()).unwrap()
    }

    fn kinds(d: &ClassDiff<'_>) -> Vec<RefactoringKind> {
        d.members.refactorings.iter().map(|r| r.kind).collect()
    }

    fn body(lines: &[&str]) -> OperationBody {
        OperationBody::new(lines.iter().map(|l| Statement::new(l)).collect())
    }

    #[test]
    fn unchanged_class_is_empty() {
        let c = Class::new("a", "Foo", "a/X.kt")
            .with_attribute(Attribute::new("count", "Int"))
            .with_operation(Operation::new("bar").with_body(body(&["println(count)"])));
        let d = diff(&c, &c);
        assert!(d.is_empty());
    }

    #[test]
    fn renamed_method_with_same_body() {
        let a = Class::new("a", "Foo", "a/X.kt")
            .with_operation(Operation::new("compute").with_body(body(&["val x = 1", "log(x)", "return x"])));
        let b = Class::new("a", "Foo", "a/X.kt")
            .with_operation(Operation::new("calculate").with_body(body(&["val x = 1", "log(x)", "return x"])));
        let d = diff(&a, &b);
        assert_eq!(kinds(&d), vec![RefactoringKind::RenameMethod]);
        assert!(d.members.removed_operations.is_empty() && d.members.added_operations.is_empty());
        assert_eq!(
            d.members.refactorings[0].description,
            "Rename Method\tpublic compute() renamed to public calculate() in class a.Foo"
        );
    }

    #[test]
    fn parameter_changes_on_same_name() {
        let a = Class::new("a", "Foo", "a/X.kt").with_operation(
            Operation::new("load").with_parameter("id", "Int").with_return("Int").with_body(body(&["return id"])),
        );
        let b = Class::new("a", "Foo", "a/X.kt").with_operation(
            Operation::new("load")
                .with_parameter("id", "Long")
                .with_parameter("cache", "Boolean")
                .with_return("Long")
                .with_body(body(&["return id"])),
        );
        let d = diff(&a, &b);
        let k = kinds(&d);
        assert!(k.contains(&RefactoringKind::ChangeParameterType));
        assert!(k.contains(&RefactoringKind::AddParameter));
        assert!(k.contains(&RefactoringKind::ChangeReturnType));
        assert!(!k.contains(&RefactoringKind::RenameMethod));
    }

    #[test]
    fn renamed_parameter_from_body_evidence() {
        let a = Class::new("a", "Foo", "a/X.kt").with_operation(
            Operation::new("send").with_parameter("payload", "String").with_body(OperationBody::new(vec![
                Statement::new("emit(payload)").uses(&["payload"]).invokes(Invocation::new(None, "emit", &["payload"])),
            ])),
        );
        let b = Class::new("a", "Foo", "a/X.kt").with_operation(
            Operation::new("send").with_parameter("message", "String").with_body(OperationBody::new(vec![
                Statement::new("emit(message)").uses(&["message"]).invokes(Invocation::new(None, "emit", &["message"])),
            ])),
        );
        let d = diff(&a, &b);
        assert_eq!(kinds(&d), vec![RefactoringKind::RenameParameter]);
    }

    #[test]
    fn extracted_operation() {
        let a = Class::new("a", "Foo", "a/X.kt").with_operation(Operation::new("run").with_body(OperationBody::new(vec![
            Statement::new("val conn = open()")
                .declares(VariableDeclaration::new("conn", None, Some("open()")))
                .invokes(Invocation::new(None, "open", &[])),
            Statement::new("validate(input)").uses(&["input"]).invokes(Invocation::new(None, "validate", &["input"])),
            Statement::new("normalize(input)").uses(&["input"]).invokes(Invocation::new(None, "normalize", &["input"])),
            Statement::new("conn.close()").uses(&["conn"]).invokes(Invocation::new(Some("conn"), "close", &[])),
        ])));
        let b = Class::new("a", "Foo", "a/X.kt")
            .with_operation(Operation::new("run").with_body(OperationBody::new(vec![
                Statement::new("val conn = open()")
                    .declares(VariableDeclaration::new("conn", None, Some("open()")))
                    .invokes(Invocation::new(None, "open", &[])),
                Statement::new("prepare()").invokes(Invocation::new(None, "prepare", &[])),
                Statement::new("conn.close()").uses(&["conn"]).invokes(Invocation::new(Some("conn"), "close", &[])),
            ])))
            .with_operation(Operation::new("prepare").with_visibility(crate::model::Visibility::Private).with_body(
                OperationBody::new(vec![
                    Statement::new("validate(input)")
                        .uses(&["input"])
                        .invokes(Invocation::new(None, "validate", &["input"])),
                    Statement::new("normalize(input)")
                        .uses(&["input"])
                        .invokes(Invocation::new(None, "normalize", &["input"])),
                ]),
            ));
        let d = diff(&a, &b);
        assert_eq!(kinds(&d), vec![RefactoringKind::ExtractOperation]);
        assert!(d.members.added_operations.is_empty());
        assert!(d.members.refactorings[0].description.contains("private prepare() extracted from public run()"));
    }

    #[test]
    fn attribute_type_change_and_rename() {
        let a = Class::new("a", "Foo", "a/X.kt")
            .with_attribute(Attribute::new("count", "Int"))
            .with_attribute(Attribute::new("label", "String").with_initializer("\"none\""));
        let b = Class::new("a", "Foo", "a/X.kt")
            .with_attribute(Attribute::new("count", "Long"))
            .with_attribute(Attribute::new("title", "String").with_initializer("\"none\""));
        let d = diff(&a, &b);
        assert_eq!(kinds(&d), vec![RefactoringKind::ChangeAttributeType, RefactoringKind::RenameAttribute]);
        assert!(d.members.removed_attributes.is_empty() && d.members.added_attributes.is_empty());
    }

    #[test]
    fn class_annotations() {
        let a = Class::new("a", "Foo", "a/X.kt").with_annotation("Deprecated");
        let b = Class::new("a", "Foo", "a/X.kt").with_annotation("Serializable");
        let d = diff(&a, &b);
        assert_eq!(kinds(&d), vec![RefactoringKind::RemoveClassAnnotation, RefactoringKind::AddClassAnnotation]);
    }
}
