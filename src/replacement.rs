//! replacement.rs
//! Evidence records: how one code shape inside a matched statement pair
//! turned into another. Replacements are immutable once built and compare by
//! their `(before, after, kind)` triple only, so collecting them in a
//! [`ReplacementSet`] deduplicates structurally identical evidence.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::body::{Invocation, ObjectCreation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplacementKind {
    VariableName,
    Type,
    StringLiteral,
    NumberLiteral,
    MethodInvocation,
    MethodInvocationName,
    MethodInvocationArgument,
    MethodInvocationExpression,
    MethodInvocationNameAndArgument,
    MethodInvocationNameAndExpression,
    MethodInvocationExpressionAndArgument,
    ClassInstanceCreation,
    ClassInstanceCreationArgument,
    ClassInstanceCreationReplacedWithMethodInvocation,
    MethodInvocationReplacedWithClassInstanceCreation,
    BuilderReplacedWithClassInstanceCreation,
    Concatenation,
    Composite,
    SplitVariable,
    MergeVariables,
}

pub type ReplacementSet = BTreeSet<Replacement>;

#[derive(Debug, Clone)]
pub struct Replacement {
    pub before: String,
    pub after: String,
    pub kind: ReplacementKind,
    pub detail: ReplacementDetail,
}

/// The compared sub-entities behind structured replacement kinds.
#[derive(Debug, Clone)]
pub enum ReplacementDetail {
    Plain,
    MethodInvocation(MethodInvocationReplacement),
    ObjectCreation { before: ObjectCreation, after: ObjectCreation },
    ClassInstanceCreationWithMethodInvocation { before: ObjectCreation, after: Invocation },
    MethodInvocationWithClassInstanceCreation { before: Invocation, after: ObjectCreation },
    Intersection { common: BTreeSet<String> },
    /// Indices into the flattened bodies of statements consumed alongside
    /// the main pair.
    Composite { additionally_matched_before: Vec<usize>, additionally_matched_after: Vec<usize> },
    SplitVariable(SplitVariableReplacement),
    MergeVariable(MergeVariableReplacement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInvocationReplacement {
    pub before: Invocation,
    pub after: Invocation,
}

/// One variable replaced by several: `data` -> `{dataHeader, dataBody}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SplitVariableReplacement {
    pub old_variable: String,
    pub split_variables: BTreeSet<String>,
}

/// Several variables replaced by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeVariableReplacement {
    pub merged_variables: BTreeSet<String>,
    pub new_variable: String,
}

impl MethodInvocationReplacement {
    pub fn differs_in_expression(&self) -> bool {
        !self.before.identical_expression(&self.after)
    }

    pub fn differs_in_name(&self) -> bool {
        !self.before.identical_name(&self.after)
    }

    pub fn differs_in_arguments(&self) -> bool {
        !self.before.equal_arguments(&self.after)
    }

    fn kind(&self) -> ReplacementKind {
        match (self.differs_in_expression(), self.differs_in_name(), self.differs_in_arguments()) {
            (false, true, false) => ReplacementKind::MethodInvocationName,
            (false, false, true) => ReplacementKind::MethodInvocationArgument,
            (true, false, false) => ReplacementKind::MethodInvocationExpression,
            (false, true, true) => ReplacementKind::MethodInvocationNameAndArgument,
            (true, true, false) => ReplacementKind::MethodInvocationNameAndExpression,
            (true, false, true) => ReplacementKind::MethodInvocationExpressionAndArgument,
            _ => ReplacementKind::MethodInvocation,
        }
    }
}

impl SplitVariableReplacement {
    pub fn new<I, S>(old_variable: &str, split_variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            old_variable: old_variable.to_string(),
            split_variables: split_variables.into_iter().map(Into::into).collect(),
        }
    }

    /// Same source variable and the same split set.
    pub fn equal(&self, other: &Self) -> bool {
        self.old_variable == other.old_variable && self.split_variables == other.split_variables
    }

    /// Same source variable, disjoint split sets.
    pub fn common_before(&self, other: &Self) -> bool {
        self.old_variable == other.old_variable && self.split_variables.is_disjoint(&other.split_variables)
    }

    /// Same source variable and a proper superset of `other`'s targets.
    pub fn subsumes(&self, other: &Self) -> bool {
        self.old_variable == other.old_variable
            && self.split_variables.len() > other.split_variables.len()
            && self.split_variables.is_superset(&other.split_variables)
    }

    fn union(&self, other: &Self) -> Self {
        Self {
            old_variable: self.old_variable.clone(),
            split_variables: self.split_variables.union(&other.split_variables).cloned().collect(),
        }
    }
}

impl MergeVariableReplacement {
    pub fn new<I, S>(merged_variables: I, new_variable: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            merged_variables: merged_variables.into_iter().map(Into::into).collect(),
            new_variable: new_variable.to_string(),
        }
    }

    pub fn equal(&self, other: &Self) -> bool {
        self.new_variable == other.new_variable && self.merged_variables == other.merged_variables
    }

    pub fn common_after(&self, other: &Self) -> bool {
        self.new_variable == other.new_variable && self.merged_variables.is_disjoint(&other.merged_variables)
    }

    pub fn subsumes(&self, other: &Self) -> bool {
        self.new_variable == other.new_variable
            && self.merged_variables.len() > other.merged_variables.len()
            && self.merged_variables.is_superset(&other.merged_variables)
    }
}

fn render_set(set: &BTreeSet<String>) -> String {
    let items: Vec<&str> = set.iter().map(String::as_str).collect();
    format!("[{}]", items.join(", "))
}

impl fmt::Display for SplitVariableReplacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.old_variable, render_set(&self.split_variables))
    }
}

impl Replacement {
    pub fn plain(before: &str, after: &str, kind: ReplacementKind) -> Self {
        Self { before: before.to_string(), after: after.to_string(), kind, detail: ReplacementDetail::Plain }
    }

    pub fn variable_name(before: &str, after: &str) -> Self {
        Self::plain(before, after, ReplacementKind::VariableName)
    }

    pub fn method_invocation(before: &Invocation, after: &Invocation) -> Self {
        let inner = MethodInvocationReplacement { before: before.clone(), after: after.clone() };
        Self {
            before: before.text.clone(),
            after: after.text.clone(),
            kind: inner.kind(),
            detail: ReplacementDetail::MethodInvocation(inner),
        }
    }

    pub fn object_creation(before: &ObjectCreation, after: &ObjectCreation) -> Self {
        let kind = if before.type_name == after.type_name {
            ReplacementKind::ClassInstanceCreationArgument
        } else {
            ReplacementKind::ClassInstanceCreation
        };
        Self {
            before: before.text.clone(),
            after: after.text.clone(),
            kind,
            detail: ReplacementDetail::ObjectCreation { before: before.clone(), after: after.clone() },
        }
    }

    /// A constructor call turned into a factory or static call.
    pub fn creation_with_invocation(before: &ObjectCreation, after: &Invocation) -> Self {
        Self {
            before: before.text.clone(),
            after: after.text.clone(),
            kind: ReplacementKind::ClassInstanceCreationReplacedWithMethodInvocation,
            detail: ReplacementDetail::ClassInstanceCreationWithMethodInvocation {
                before: before.clone(),
                after: after.clone(),
            },
        }
    }

    /// A call turned into a constructor call; `x.build()` into `Builder(x)`
    /// is classified as a builder replacement.
    pub fn invocation_with_creation(before: &Invocation, after: &ObjectCreation) -> Self {
        let kind = if before.name == "build" {
            ReplacementKind::BuilderReplacedWithClassInstanceCreation
        } else {
            ReplacementKind::MethodInvocationReplacedWithClassInstanceCreation
        };
        Self {
            before: before.text.clone(),
            after: after.text.clone(),
            kind,
            detail: ReplacementDetail::MethodInvocationWithClassInstanceCreation {
                before: before.clone(),
                after: after.clone(),
            },
        }
    }

    pub fn intersection(before: &str, after: &str, common: BTreeSet<String>, kind: ReplacementKind) -> Self {
        Self {
            before: before.to_string(),
            after: after.to_string(),
            kind,
            detail: ReplacementDetail::Intersection { common },
        }
    }

    pub fn composite(before: &str, after: &str, matched_before: Vec<usize>, matched_after: Vec<usize>) -> Self {
        Self {
            before: before.to_string(),
            after: after.to_string(),
            kind: ReplacementKind::Composite,
            detail: ReplacementDetail::Composite {
                additionally_matched_before: matched_before,
                additionally_matched_after: matched_after,
            },
        }
    }

    pub fn split_variable(split: SplitVariableReplacement) -> Self {
        Self {
            before: split.old_variable.clone(),
            after: render_set(&split.split_variables),
            kind: ReplacementKind::SplitVariable,
            detail: ReplacementDetail::SplitVariable(split),
        }
    }

    pub fn merge_variable(merge: MergeVariableReplacement) -> Self {
        Self {
            before: render_set(&merge.merged_variables),
            after: merge.new_variable.clone(),
            kind: ReplacementKind::MergeVariables,
            detail: ReplacementDetail::MergeVariable(merge),
        }
    }

    pub fn as_method_invocation(&self) -> Option<&MethodInvocationReplacement> {
        match &self.detail {
            ReplacementDetail::MethodInvocation(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_split_variable(&self) -> Option<&SplitVariableReplacement> {
        match &self.detail {
            ReplacementDetail::SplitVariable(split) => Some(split),
            _ => None,
        }
    }

    pub fn as_merge_variable(&self) -> Option<&MergeVariableReplacement> {
        match &self.detail {
            ReplacementDetail::MergeVariable(merge) => Some(merge),
            _ => None,
        }
    }

    fn key(&self) -> (&str, &str, ReplacementKind) {
        (&self.before, &self.after, self.kind)
    }
}

impl PartialEq for Replacement {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Replacement {}

impl Hash for Replacement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Replacement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Replacement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.before, self.after)
    }
}

/// Split-variable hypotheses of one body mapping, consolidated so that only
/// the most subsuming hypothesis per source variable survives. Each entry
/// keeps the indices of the statement mappings that back it.
#[derive(Debug, Default)]
pub struct SplitVariableRegistry {
    entries: BTreeMap<SplitVariableReplacement, BTreeSet<usize>>,
}

impl SplitVariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, split: SplitVariableReplacement, evidence: usize) {
        // An existing hypothesis already covers this one.
        if let Some(backing) = self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.equal(&split) || existing.subsumes(&split))
            .map(|(_, backing)| backing)
        {
            backing.insert(evidence);
            return;
        }

        // Same source, disjoint targets: both are parts of one wider split.
        if let Some(existing) = self.entries.keys().find(|existing| existing.common_before(&split)).cloned() {
            let mut backing = self.entries.remove(&existing).unwrap_or_default();
            backing.insert(evidence);
            self.absorb(existing.union(&split), backing);
            return;
        }

        self.absorb(split, BTreeSet::from([evidence]));
    }

    /// Inserts `split`, folding in every entry it subsumes.
    fn absorb(&mut self, split: SplitVariableReplacement, mut backing: BTreeSet<usize>) {
        let subsumed: Vec<SplitVariableReplacement> =
            self.entries.keys().filter(|existing| split.subsumes(existing)).cloned().collect();
        for existing in subsumed {
            if let Some(more) = self.entries.remove(&existing) {
                backing.extend(more);
            }
        }
        self.entries.entry(split).or_default().extend(backing);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn splits(&self) -> impl Iterator<Item = (&SplitVariableReplacement, &BTreeSet<usize>)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_by_triple() {
        let a = Replacement::variable_name("x", "y");
        let b = Replacement::variable_name("x", "y");
        let c = Replacement::plain("x", "y", ReplacementKind::Type);
        let set: ReplacementSet = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn invocation_kind_reflects_differences() {
        let before = Invocation::new(Some("svc"), "load", &["id"]);
        let renamed = Invocation::new(Some("svc"), "fetch", &["id"]);
        let re_arg = Invocation::new(Some("svc"), "load", &["key"]);
        let both = Invocation::new(Some("svc"), "fetch", &["key"]);
        assert_eq!(Replacement::method_invocation(&before, &renamed).kind, ReplacementKind::MethodInvocationName);
        assert_eq!(Replacement::method_invocation(&before, &re_arg).kind, ReplacementKind::MethodInvocationArgument);
        assert_eq!(
            Replacement::method_invocation(&before, &both).kind,
            ReplacementKind::MethodInvocationNameAndArgument
        );
        let r = Replacement::method_invocation(&before, &both);
        let inner = r.as_method_invocation().unwrap();
        assert!(inner.differs_in_name() && inner.differs_in_arguments() && !inner.differs_in_expression());
    }

    #[test]
    fn builder_to_constructor() {
        let build = Invocation::new(Some("a"), "build", &[]);
        let ctor = ObjectCreation::new("Builder", &["a"]);
        let r = Replacement::invocation_with_creation(&build, &ctor);
        assert_eq!(r.kind, ReplacementKind::BuilderReplacedWithClassInstanceCreation);
        assert_eq!(r.to_string(), "a.build() -> Builder(a)");
    }

    #[test]
    fn split_relations() {
        let narrow = SplitVariableReplacement::new("data", ["dataHeader"]);
        let other = SplitVariableReplacement::new("data", ["dataBody"]);
        let wide = SplitVariableReplacement::new("data", ["dataHeader", "dataBody"]);
        assert!(wide.subsumes(&narrow));
        assert!(!narrow.subsumes(&wide));
        assert!(!wide.subsumes(&wide));
        assert!(narrow.common_before(&other));
        assert!(!narrow.common_before(&wide));
        assert!(wide.equal(&wide.clone()));
        assert_eq!(wide.to_string(), "data to [dataBody, dataHeader]");
    }

    #[test]
    fn registry_keeps_most_subsuming_hypothesis() {
        let mut registry = SplitVariableRegistry::new();
        registry.record(SplitVariableReplacement::new("data", ["dataHeader"]), 0);
        registry.record(SplitVariableReplacement::new("data", ["dataHeader", "dataBody"]), 1);
        registry.record(SplitVariableReplacement::new("data", ["dataBody"]), 2);
        assert_eq!(registry.len(), 1);
        let (split, backing) = registry.splits().next().unwrap();
        assert_eq!(split.split_variables.len(), 2);
        assert_eq!(backing, &BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn registry_merges_disjoint_parts() {
        let mut registry = SplitVariableRegistry::new();
        registry.record(SplitVariableReplacement::new("data", ["dataHeader"]), 0);
        registry.record(SplitVariableReplacement::new("data", ["dataBody"]), 1);
        registry.record(SplitVariableReplacement::new("other", ["x", "y"]), 2);
        assert_eq!(registry.len(), 2);
        let merged: Vec<_> = registry.splits().map(|(s, _)| s.to_string()).collect();
        assert!(merged.contains(&"data to [dataBody, dataHeader]".to_string()));
    }
}
