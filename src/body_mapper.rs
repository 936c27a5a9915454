//! body_mapper.rs
//! Statement-level correspondence between two versions of an operation body,
//! and the variable refactorings that fall out of it.
//!
//! Leaves are mapped first in three passes of decreasing strictness (equal
//! text at equal depth, equal text anywhere, equal after replacements), then
//! composite statements. Between the exact and the replacement passes, a new
//! or vanished `val t = expr` declaration is tried as an extracted or inlined
//! variable so that those pairs are explained by one composite replacement
//! instead of loose call or variable evidence.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::body::{FlatStatement, Statement, VariableDeclaration};
use crate::config::DiffConfig;
use crate::error::{Deadline, Result};
use crate::location::{CodeElementType, CodeRange, LocationInfo};
use crate::model::Operation;
use crate::refactoring::{Refactoring, RefactoringKind};
use crate::replacement::{
    MergeVariableReplacement, Replacement, ReplacementKind, ReplacementSet, SplitVariableRegistry,
    SplitVariableReplacement,
};
use crate::similarity::{normalized_edit_distance, replace_identifier};
use crate::statement_matcher::{MatchContext, StatementMatcher};

#[derive(Debug, Clone)]
pub struct StatementMapping {
    pub index1: usize,
    pub index2: usize,
    pub replacements: ReplacementSet,
}

impl StatementMapping {
    pub fn is_exact(&self) -> bool {
        self.replacements.is_empty()
    }
}

/// A declaration statement consumed by an extract/inline-variable mapping.
#[derive(Debug, Clone, Copy)]
struct VariableMove {
    declaration: usize,
    mapping: usize,
}

pub struct BodyMapper<'a> {
    pub operation1: &'a Operation,
    pub operation2: &'a Operation,
    flat1: Vec<FlatStatement<'a>>,
    flat2: Vec<FlatStatement<'a>>,
    pub mappings: Vec<StatementMapping>,
    pub non_mapped_leaves1: Vec<usize>,
    pub non_mapped_leaves2: Vec<usize>,
    pub non_mapped_inner_nodes1: Vec<usize>,
    pub non_mapped_inner_nodes2: Vec<usize>,
    extracted_variables: Vec<VariableMove>,
    inlined_variables: Vec<VariableMove>,
}

fn flatten(op: &Operation) -> Vec<FlatStatement<'_>> {
    op.body.as_ref().map(|b| b.flatten()).unwrap_or_default()
}

fn variable_names(op: &Operation) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = op.parameter_names().into_iter().map(str::to_string).collect();
    if let Some(body) = &op.body {
        names.extend(body.variable_declarations().into_iter().map(|d| d.name.clone()));
    }
    names
}

impl<'a> BodyMapper<'a> {
    /// Maps the complete bodies of two versions of one operation.
    pub fn new(op1: &'a Operation, op2: &'a Operation, deadline: &Deadline, config: &DiffConfig) -> Result<Self> {
        let flat1 = flatten(op1);
        let flat2 = flatten(op2);
        let all1: Vec<usize> = (0..flat1.len()).collect();
        let all2: Vec<usize> = (0..flat2.len()).collect();
        let mut mapper = Self::empty(op1, op2, flat1, flat2);
        mapper.map(&all1, &all2, deadline, config)?;
        Ok(mapper)
    }

    /// Maps the statements `parent` left unmatched in its left body against
    /// the whole body of a newly added operation.
    pub fn for_extracted(
        parent: &BodyMapper<'a>,
        extracted: &'a Operation,
        deadline: &Deadline,
        config: &DiffConfig,
    ) -> Result<Self> {
        let allowed1: Vec<usize> =
            parent.non_mapped_leaves1.iter().chain(&parent.non_mapped_inner_nodes1).copied().collect();
        let flat2 = flatten(extracted);
        let all2: Vec<usize> = (0..flat2.len()).collect();
        let mut mapper = Self::empty(parent.operation1, extracted, parent.flat1.clone(), flat2);
        mapper.map(&allowed1, &all2, deadline, config)?;
        Ok(mapper)
    }

    /// Maps the whole body of a removed operation against the statements
    /// `parent` left unmatched in its right body.
    pub fn for_inlined(
        parent: &BodyMapper<'a>,
        inlined: &'a Operation,
        deadline: &Deadline,
        config: &DiffConfig,
    ) -> Result<Self> {
        let flat1 = flatten(inlined);
        let all1: Vec<usize> = (0..flat1.len()).collect();
        let allowed2: Vec<usize> =
            parent.non_mapped_leaves2.iter().chain(&parent.non_mapped_inner_nodes2).copied().collect();
        let mut mapper = Self::empty(inlined, parent.operation2, flat1, parent.flat2.clone());
        mapper.map(&all1, &allowed2, deadline, config)?;
        Ok(mapper)
    }

    fn empty(op1: &'a Operation, op2: &'a Operation, flat1: Vec<FlatStatement<'a>>, flat2: Vec<FlatStatement<'a>>) -> Self {
        Self {
            operation1: op1,
            operation2: op2,
            flat1,
            flat2,
            mappings: Vec::new(),
            non_mapped_leaves1: Vec::new(),
            non_mapped_leaves2: Vec::new(),
            non_mapped_inner_nodes1: Vec::new(),
            non_mapped_inner_nodes2: Vec::new(),
            extracted_variables: Vec::new(),
            inlined_variables: Vec::new(),
        }
    }

    pub fn statement1(&self, index: usize) -> &'a Statement {
        self.flat1[index].statement
    }

    pub fn statement2(&self, index: usize) -> &'a Statement {
        self.flat2[index].statement
    }

    pub fn exact_matches(&self) -> usize {
        self.mappings.iter().filter(|m| m.is_exact()).count()
    }

    /// More mapped statements than unmapped leaves on either side.
    pub fn mapping_dominates(&self) -> bool {
        let m = self.mappings.len();
        m > 0 && m > self.non_mapped_leaves1.len() && m > self.non_mapped_leaves2.len()
    }

    pub fn replacements(&self) -> impl Iterator<Item = &Replacement> {
        self.mappings.iter().flat_map(|m| m.replacements.iter())
    }

    /// A call to `op` (by name and arity) somewhere in the right body.
    pub fn calls_in_body2(&self, op: &Operation) -> bool {
        let arity = op.input_parameters().count();
        self.flat2
            .iter()
            .flat_map(|f| f.statement.invocations.iter())
            .any(|i| i.name == op.name && i.arguments.len() == arity)
    }

    /// A call to `op` somewhere in the left body.
    pub fn calls_in_body1(&self, op: &Operation) -> bool {
        let arity = op.input_parameters().count();
        self.flat1
            .iter()
            .flat_map(|f| f.statement.invocations.iter())
            .any(|i| i.name == op.name && i.arguments.len() == arity)
    }

    fn map(&mut self, allowed1: &[usize], allowed2: &[usize], deadline: &Deadline, config: &DiffConfig) -> Result<()> {
        let names1 = variable_names(self.operation1);
        let names2 = variable_names(self.operation2);
        let new_variables: BTreeSet<String> = names2.difference(&names1).cloned().collect();
        let removed_variables: BTreeSet<String> = names1.difference(&names2).cloned().collect();
        let matcher = StatementMatcher::new(MatchContext {
            deadline,
            max_candidates: config.max_replacement_candidates,
            max_name_distance: config.max_operation_name_distance,
            new_variables: &new_variables,
            removed_variables: &removed_variables,
        });

        let (mut leaves1, mut inner1): (BTreeSet<usize>, BTreeSet<usize>) = (BTreeSet::new(), BTreeSet::new());
        for &i in allowed1 {
            if self.flat1[i].statement.is_composite() {
                inner1.insert(i);
            } else {
                leaves1.insert(i);
            }
        }
        let (mut leaves2, mut inner2): (BTreeSet<usize>, BTreeSet<usize>) = (BTreeSet::new(), BTreeSet::new());
        for &j in allowed2 {
            if self.flat2[j].statement.is_composite() {
                inner2.insert(j);
            } else {
                leaves2.insert(j);
            }
        }

        // 1) equal text at equal depth, 2) equal text anywhere
        for same_depth in [true, false] {
            for i in leaves1.clone() {
                deadline.check("statement mapping")?;
                let s1 = &self.flat1[i];
                let hit = leaves2.iter().copied().find(|&j| {
                    let s2 = &self.flat2[j];
                    s2.statement.text == s1.statement.text && (!same_depth || s2.depth == s1.depth)
                });
                if let Some(j) = hit {
                    self.push_mapping(i, j, ReplacementSet::new());
                    leaves1.remove(&i);
                    leaves2.remove(&j);
                }
            }
        }

        self.detect_variable_moves(&mut leaves1, &mut leaves2, &names1, &names2);

        // 3) equal after replacements; closest text wins
        for i in leaves1.clone() {
            let mut best: Option<(usize, ReplacementSet, f64)> = None;
            for &j in &leaves2 {
                deadline.check("statement mapping")?;
                let (s1, s2) = (self.flat1[i].statement, self.flat2[j].statement);
                if let Some(found) = matcher.find_replacements(s1, s2)? {
                    let score = normalized_edit_distance(&s1.text, &s2.text);
                    let better = match &best {
                        None => true,
                        Some((_, prev, prev_score)) => {
                            score < *prev_score || (score == *prev_score && found.len() < prev.len())
                        }
                    };
                    if better {
                        best = Some((j, found, score));
                    }
                }
            }
            if let Some((j, found, _)) = best {
                self.push_mapping(i, j, found);
                leaves1.remove(&i);
                leaves2.remove(&j);
            }
        }

        // composites: equal header, then header equal after replacements with
        // at least one mapped child pair underneath
        for i in inner1.clone() {
            let hit = inner2.iter().copied().find(|&j| self.flat1[i].statement.text == self.flat2[j].statement.text);
            if let Some(j) = hit {
                self.push_mapping(i, j, ReplacementSet::new());
                inner1.remove(&i);
                inner2.remove(&j);
            }
        }
        for i in inner1.clone() {
            for j in inner2.clone() {
                deadline.check("statement mapping")?;
                if !self.children_mapped(i, j) {
                    continue;
                }
                if let Some(found) = matcher.find_replacements(self.flat1[i].statement, self.flat2[j].statement)? {
                    self.push_mapping(i, j, found);
                    inner1.remove(&i);
                    inner2.remove(&j);
                    break;
                }
            }
        }

        self.non_mapped_leaves1 = leaves1.into_iter().collect();
        self.non_mapped_leaves2 = leaves2.into_iter().collect();
        self.non_mapped_inner_nodes1 = inner1.into_iter().collect();
        self.non_mapped_inner_nodes2 = inner2.into_iter().collect();
        debug!(
            operation = %self.operation2.name,
            mapped = self.mappings.len(),
            unmapped1 = self.non_mapped_leaves1.len(),
            unmapped2 = self.non_mapped_leaves2.len(),
            "body mapping done"
        );
        Ok(())
    }

    fn push_mapping(&mut self, index1: usize, index2: usize, replacements: ReplacementSet) -> usize {
        self.mappings.push(StatementMapping { index1, index2, replacements });
        self.mappings.len() - 1
    }

    fn children_mapped(&self, i: usize, j: usize) -> bool {
        self.mappings
            .iter()
            .any(|m| self.flat1[m.index1].parent == Some(i) && self.flat2[m.index2].parent == Some(j))
    }

    /// `foo(bar())` -> `val t = bar(); foo(t)` and the reverse.
    fn detect_variable_moves(
        &mut self,
        leaves1: &mut BTreeSet<usize>,
        leaves2: &mut BTreeSet<usize>,
        names1: &BTreeSet<String>,
        names2: &BTreeSet<String>,
    ) {
        for d in leaves2.clone() {
            let Some((name, init)) = single_initialized(self.flat2[d].statement) else { continue };
            if names1.contains(name) || !leaves2.contains(&d) {
                continue;
            }
            let hit = leaves2.iter().copied().filter(|&x| x != d).find_map(|x| {
                let text = &self.flat2[x].statement.text;
                let inlined = replace_identifier(text, name, init);
                if inlined == *text {
                    return None;
                }
                leaves1.iter().copied().find(|&u| self.flat1[u].statement.text == inlined).map(|u| (u, x))
            });
            if let Some((u, x)) = hit {
                let r = Replacement::composite(init, name, Vec::new(), vec![d]);
                let mapping = self.push_mapping(u, x, ReplacementSet::from([r]));
                self.extracted_variables.push(VariableMove { declaration: d, mapping });
                leaves1.remove(&u);
                leaves2.remove(&x);
                leaves2.remove(&d);
            }
        }

        for d in leaves1.clone() {
            let Some((name, init)) = single_initialized(self.flat1[d].statement) else { continue };
            if names2.contains(name) || !leaves1.contains(&d) {
                continue;
            }
            let hit = leaves1.iter().copied().filter(|&u| u != d).find_map(|u| {
                let text = &self.flat1[u].statement.text;
                let inlined = replace_identifier(text, name, init);
                if inlined == *text {
                    return None;
                }
                leaves2.iter().copied().find(|&x| self.flat2[x].statement.text == inlined).map(|x| (u, x))
            });
            if let Some((u, x)) = hit {
                let r = Replacement::composite(name, init, vec![d], Vec::new());
                let mapping = self.push_mapping(u, x, ReplacementSet::from([r]));
                self.inlined_variables.push(VariableMove { declaration: d, mapping });
                leaves1.remove(&u);
                leaves1.remove(&d);
                leaves2.remove(&x);
            }
        }
    }

    fn declaration1(&self, name: &str) -> Option<VariableSite<'a>> {
        site(self.operation1, &self.flat1, name)
    }

    fn declaration2(&self, name: &str) -> Option<VariableSite<'a>> {
        site(self.operation2, &self.flat2, name)
    }

    /// Rename, retype, split, merge, extract and inline of local variables
    /// and parameters, derived from the collected replacements.
    pub fn variable_refactorings(&self) -> Vec<Refactoring> {
        let mut out = Vec::new();
        let op1 = self.operation1;
        let op2 = self.operation2;

        // old name -> new name -> backing mappings
        let mut renames: BTreeMap<&str, BTreeMap<&str, BTreeSet<usize>>> = BTreeMap::new();
        for (idx, m) in self.mappings.iter().enumerate() {
            for r in m.replacements.iter().filter(|r| r.kind == ReplacementKind::VariableName) {
                let vanished = self.declaration1(&r.before).is_some() && self.declaration2(&r.before).is_none();
                let appeared = self.declaration2(&r.after).is_some() && self.declaration1(&r.after).is_none();
                if vanished && appeared {
                    renames.entry(&r.before).or_default().entry(&r.after).or_default().insert(idx);
                }
            }
        }

        let mut registry = SplitVariableRegistry::new();
        for (old, targets) in &renames {
            if targets.len() < 2 {
                continue;
            }
            for (new, backing) in targets {
                for &idx in backing {
                    registry.record(SplitVariableReplacement::new(old, [*new]), idx);
                }
            }
        }
        for (idx, m) in self.mappings.iter().enumerate() {
            for split in m.replacements.iter().filter_map(|r| r.as_split_variable()) {
                registry.record(split.clone(), idx);
            }
        }
        let split_sources: BTreeSet<&str> = registry.splits().map(|(s, _)| s.old_variable.as_str()).collect();

        let mut target_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for targets in renames.values() {
            for new in targets.keys() {
                *target_counts.entry(new).or_default() += 1;
            }
        }
        for (old, targets) in &renames {
            if targets.len() != 1 || split_sources.contains(old) {
                continue;
            }
            let Some(new) = targets.keys().next().copied() else { continue };
            if target_counts.get(new).copied().unwrap_or(0) != 1 {
                continue;
            }
            let (Some(before), Some(after)) = (self.declaration1(old), self.declaration2(new)) else { continue };
            if before.is_parameter() || after.is_parameter() {
                continue;
            }
            out.push(
                self.report(
                    RefactoringKind::RenameVariable,
                    format!("{} to {} in method {} from class {}", before.describe(), after.describe(), op2, op2.class_name),
                )
                .left(before.range("original variable declaration"))
                .right(after.range("renamed variable declaration")),
            );
        }

        for (split, _) in registry.splits() {
            let Some(before) = self.declaration1(&split.old_variable) else { continue };
            let afters: Vec<VariableSite<'a>> =
                split.split_variables.iter().filter_map(|n| self.declaration2(n)).collect();
            if afters.len() != split.split_variables.len() {
                continue;
            }
            let kind = if before.is_parameter() && afters.iter().all(|a| a.is_parameter()) {
                RefactoringKind::SplitParameter
            } else {
                RefactoringKind::SplitVariable
            };
            let mut r = self
                .report(kind, format!("{} in method {} from class {}", split, op2, op2.class_name))
                .left(before.range("original variable declaration"));
            for after in &afters {
                r = r.right(after.range("split variable declaration"));
            }
            out.push(r);
        }

        let merges: Vec<_> = self.replacements().filter_map(|r| r.as_merge_variable()).collect();
        let mut reported: Vec<&MergeVariableReplacement> = Vec::new();
        for merge in &merges {
            let covered =
                merges.iter().any(|other| other.subsumes(merge)) || reported.iter().any(|done| done.equal(merge));
            if covered {
                continue;
            }
            let Some(after) = self.declaration2(&merge.new_variable) else { continue };
            let names: Vec<&str> = merge.merged_variables.iter().map(String::as_str).collect();
            let mut r = self.report(
                RefactoringKind::MergeVariable,
                format!("[{}] to {} in method {} from class {}", names.join(", "), after.describe(), op2, op2.class_name),
            );
            for name in &names {
                if let Some(before) = self.declaration1(name) {
                    r = r.left(before.range("merged variable declaration"));
                }
            }
            out.push(r.right(after.range("new variable declaration")));
            reported.push(*merge);
        }

        let mut retyped = BTreeSet::new();
        for m in &self.mappings {
            let (s1, s2) = (self.flat1[m.index1].statement, self.flat2[m.index2].statement);
            for d1 in &s1.variable_declarations {
                for d2 in &s2.variable_declarations {
                    let same_variable = d1.name == d2.name
                        || renames.get(d1.name.as_str()).is_some_and(|t| t.contains_key(d2.name.as_str()));
                    let (Some(t1), Some(t2)) = (&d1.ty, &d2.ty) else { continue };
                    if !same_variable || t1.equals_qualified(t2) || !retyped.insert((d1.name.clone(), d2.name.clone())) {
                        continue;
                    }
                    out.push(
                        self.report(
                            RefactoringKind::ChangeVariableType,
                            format!("{} to {} in method {} from class {}", d1.describe(), d2.describe(), op2, op2.class_name),
                        )
                        .left(declaration_range(d1, &s1.location, "original variable declaration"))
                        .right(declaration_range(d2, &s2.location, "changed-type variable declaration")),
                    );
                }
            }
        }

        for moved in &self.extracted_variables {
            let declaration_stmt = self.flat2[moved.declaration].statement;
            let Some(decl) = declaration_stmt.variable_declarations.first() else { continue };
            let source = self.flat1[self.mappings[moved.mapping].index1].statement;
            out.push(
                self.report(
                    RefactoringKind::ExtractVariable,
                    format!("{} in method {} from class {}", decl.describe(), op2, op2.class_name),
                )
                .left(source.location.code_range("statement with the initializer of the extracted variable", &source.text))
                .right(declaration_range(decl, &declaration_stmt.location, "extracted variable declaration")),
            );
        }

        for moved in &self.inlined_variables {
            let declaration_stmt = self.flat1[moved.declaration].statement;
            let Some(decl) = declaration_stmt.variable_declarations.first() else { continue };
            let target = self.flat2[self.mappings[moved.mapping].index2].statement;
            out.push(
                self.report(
                    RefactoringKind::InlineVariable,
                    format!("{} in method {} from class {}", decl.describe(), op1, op1.class_name),
                )
                .left(declaration_range(decl, &declaration_stmt.location, "inlined variable declaration"))
                .right(target.location.code_range("statement with the inlined expression", &target.text)),
            );
        }
        out
    }

    fn report(&self, kind: RefactoringKind, detail: String) -> Refactoring {
        Refactoring::new(kind, detail)
            .class_before(&self.operation1.location.file_path, &self.operation1.class_name)
            .class_after(&self.operation2.location.file_path, &self.operation2.class_name)
    }
}

/// Where a variable name is introduced: a local declaration or a parameter.
#[derive(Debug, Clone, Copy)]
enum VariableSite<'a> {
    Local(&'a VariableDeclaration, &'a LocationInfo),
    Parameter(&'a Operation, &'a str),
}

impl<'a> VariableSite<'a> {
    fn is_parameter(&self) -> bool {
        matches!(self, VariableSite::Parameter(..))
    }

    fn describe(&self) -> String {
        match self {
            VariableSite::Local(decl, _) => decl.describe(),
            VariableSite::Parameter(op, name) => op
                .input_parameters()
                .find(|p| p.name == *name)
                .map(|p| p.to_string())
                .unwrap_or_else(|| name.to_string()),
        }
    }

    fn range(&self, description: &str) -> CodeRange {
        match self {
            VariableSite::Local(decl, stmt_location) => declaration_range(decl, stmt_location, description),
            VariableSite::Parameter(op, _) => op
                .location
                .clone()
                .with_element_type(CodeElementType::SingleVariableDeclaration)
                .code_range(description, self.describe()),
        }
    }
}

fn site<'a>(op: &'a Operation, flat: &[FlatStatement<'a>], name: &str) -> Option<VariableSite<'a>> {
    if let Some(p) = op.input_parameters().find(|p| p.name == name) {
        return Some(VariableSite::Parameter(op, &p.name));
    }
    flat.iter().find_map(|f| {
        f.statement
            .variable_declarations
            .iter()
            .find(|d| d.name == name)
            .map(|d| VariableSite::Local(d, &f.statement.location))
    })
}

/// Declarations without their own span fall back to the enclosing statement.
fn declaration_range(decl: &VariableDeclaration, statement: &LocationInfo, description: &str) -> CodeRange {
    let location = if decl.location.file_path.is_empty() { statement } else { &decl.location };
    location.clone().with_element_type(CodeElementType::VariableDeclarationStatement).code_range(description, decl.describe())
}

fn single_initialized(statement: &Statement) -> Option<(&str, &str)> {
    match statement.variable_declarations.as_slice() {
        [decl] => decl.initializer.as_deref().map(|init| (decl.name.as_str(), init)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Invocation, OperationBody};

    fn op(name: &str, statements: Vec<Statement>) -> Operation {
        let mut o = Operation::new(name).with_body(OperationBody::new(statements));
        o.class_name = "a.Foo".into();
        o
    }

    fn map<'a>(op1: &'a Operation, op2: &'a Operation) -> BodyMapper<'a> {
        BodyMapper::new(op1, op2, &Deadline::unbounded(), &DiffConfig::default()).unwrap()
    }

    #[test]
    fn identical_bodies_map_exactly() {
        let body = vec![Statement::new("val x = 1"), Statement::composite("if (x > 0)", vec![Statement::new("run(x)")])];
        let a = op("bar", body.clone());
        let b = op("bar", body);
        let m = map(&a, &b);
        assert_eq!(m.mappings.len(), 3);
        assert_eq!(m.exact_matches(), 3);
        assert!(m.non_mapped_leaves1.is_empty() && m.non_mapped_inner_nodes2.is_empty());
        assert!(m.variable_refactorings().is_empty());
    }

    #[test]
    fn renamed_local_variable() {
        let a = op(
            "bar",
            vec![
                Statement::new("val payload = load()")
                    .declares(VariableDeclaration::new("payload", Some("String"), Some("load()")))
                    .invokes(Invocation::new(None, "load", &[])),
                Statement::new("send(payload)").uses(&["payload"]).invokes(Invocation::new(None, "send", &["payload"])),
            ],
        );
        let b = op(
            "bar",
            vec![
                Statement::new("val message = load()")
                    .declares(VariableDeclaration::new("message", Some("String"), Some("load()")))
                    .invokes(Invocation::new(None, "load", &[])),
                Statement::new("send(message)").uses(&["message"]).invokes(Invocation::new(None, "send", &["message"])),
            ],
        );
        let m = map(&a, &b);
        assert_eq!(m.mappings.len(), 2);
        let refs = m.variable_refactorings();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, RefactoringKind::RenameVariable);
        assert!(refs[0].description.contains("payload : String to message : String"));
    }

    #[test]
    fn extracted_variable_uses_composite_evidence() {
        let a = op(
            "bar",
            vec![Statement::new("consume(compute())").invokes(Invocation::new(None, "consume", &["compute()"]))],
        );
        let b = op(
            "bar",
            vec![
                Statement::new("val value = compute()")
                    .declares(VariableDeclaration::new("value", None, Some("compute()")))
                    .invokes(Invocation::new(None, "compute", &[])),
                Statement::new("consume(value)").uses(&["value"]).invokes(Invocation::new(None, "consume", &["value"])),
            ],
        );
        let m = map(&a, &b);
        assert_eq!(m.mappings.len(), 1);
        assert!(m.non_mapped_leaves2.is_empty());
        let kinds: Vec<_> = m.replacements().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ReplacementKind::Composite]);
        let refs = m.variable_refactorings();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, RefactoringKind::ExtractVariable);
    }

    #[test]
    fn split_variable_subsumes_single_target_rename() {
        let a = op(
            "process",
            vec![
                Statement::new("val data = read()").declares(VariableDeclaration::new("data", None, Some("read()"))),
                Statement::new("consume(data)").uses(&["data"]).invokes(Invocation::new(None, "consume", &["data"])),
            ],
        );
        let b = op(
            "process",
            vec![
                Statement::new("val dataHeader = read()")
                    .declares(VariableDeclaration::new("dataHeader", None, Some("read()"))),
                Statement::new("val dataBody = read()").declares(VariableDeclaration::new("dataBody", None, Some("read()"))),
                Statement::new("consume(dataHeader, dataBody)")
                    .uses(&["dataHeader", "dataBody"])
                    .invokes(Invocation::new(None, "consume", &["dataHeader", "dataBody"])),
            ],
        );
        let m = map(&a, &b);
        let refs = m.variable_refactorings();
        assert_eq!(refs.len(), 1, "{refs:?}");
        assert_eq!(refs[0].kind, RefactoringKind::SplitVariable);
        assert!(refs[0].description.contains("data to [dataBody, dataHeader]"));
        assert_eq!(refs[0].right_side.len(), 2);
    }

    #[test]
    fn unrelated_statements_stay_unmapped() {
        let a = op("bar", vec![Statement::new("log(x)").uses(&["x"]).invokes(Invocation::new(None, "log", &["x"]))]);
        let b = op("bar", vec![Statement::new("return 42")]);
        let m = map(&a, &b);
        assert!(m.mappings.is_empty());
        assert_eq!(m.non_mapped_leaves1, vec![0]);
        assert_eq!(m.non_mapped_leaves2, vec![0]);
        assert!(!m.mapping_dominates());
    }
}
