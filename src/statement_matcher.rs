//! statement_matcher.rs
//! The evidence engine: explains the difference between two statements as a
//! set of replacements, or reports that it cannot.
//!
//! The search is greedy. Candidates of one family are tried against a working
//! copy of the left statement; a candidate is accepted only when substituting
//! it brings the working text strictly closer to the right statement. The
//! pair matches when the working text ends up identical to the target.

use std::collections::BTreeSet;

use tracing::trace;

use crate::body::{Invocation, Statement};
use crate::error::{Deadline, Result};
use crate::replacement::{
    MergeVariableReplacement, Replacement, ReplacementKind, ReplacementSet, SplitVariableReplacement,
};
use crate::similarity::{normalized_edit_distance, replace_identifier};

/// What the engine knows about the two enclosing operations.
pub struct MatchContext<'a> {
    pub deadline: &'a Deadline,
    pub max_candidates: usize,
    pub max_name_distance: f64,
    /// Variables and parameters only the right-hand operation has.
    pub new_variables: &'a BTreeSet<String>,
    /// Variables and parameters only the left-hand operation has.
    pub removed_variables: &'a BTreeSet<String>,
}

pub struct StatementMatcher<'a> {
    ctx: MatchContext<'a>,
}

impl<'a> StatementMatcher<'a> {
    pub fn new(ctx: MatchContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &MatchContext<'a> {
        &self.ctx
    }

    /// `Some(replacements)` when they fully explain how `s1` became `s2`;
    /// an empty set means the statements are textually identical.
    pub fn find_replacements(&self, s1: &Statement, s2: &Statement) -> Result<Option<ReplacementSet>> {
        if s1.text == s2.text {
            return Ok(Some(ReplacementSet::new()));
        }
        let target = s2.text.as_str();
        let mut working = s1.text.clone();
        let mut found = ReplacementSet::new();

        self.split_and_merge(s1, s2, &mut working, &mut found);

        let vars1 = only_in(&s1.variables, &s2.variables);
        let vars2 = only_in(&s2.variables, &s1.variables);
        let candidates = pairs(&vars1, &vars2, |a, b| Some(Replacement::variable_name(a, b)));
        self.apply_greedy(&mut working, target, candidates, &mut found)?;

        let types = declared_type_changes(s1, s2);
        self.apply_greedy(&mut working, target, types, &mut found)?;

        let strings = pairs(
            &only_in(&s1.string_literals, &s2.string_literals),
            &only_in(&s2.string_literals, &s1.string_literals),
            |a, b| Some(Replacement::plain(a, b, ReplacementKind::StringLiteral)),
        );
        self.apply_greedy(&mut working, target, strings, &mut found)?;
        let numbers = pairs(
            &only_in(&s1.number_literals, &s2.number_literals),
            &only_in(&s2.number_literals, &s1.number_literals),
            |a, b| Some(Replacement::plain(a, b, ReplacementKind::NumberLiteral)),
        );
        self.apply_greedy(&mut working, target, numbers, &mut found)?;

        let inv1: Vec<&Invocation> =
            s1.invocations.iter().filter(|i| !s2.invocations.iter().any(|j| j.text == i.text)).collect();
        let inv2: Vec<&Invocation> =
            s2.invocations.iter().filter(|j| !s1.invocations.iter().any(|i| i.text == j.text)).collect();
        let mut calls = Vec::new();
        for i1 in &inv1 {
            for i2 in &inv2 {
                if self.related_calls(i1, i2) {
                    calls.push(Replacement::method_invocation(i1, i2));
                }
            }
        }
        self.apply_greedy(&mut working, target, calls, &mut found)?;

        let new1: Vec<_> = s1.creations.iter().filter(|c| !s2.creations.iter().any(|d| d.text == c.text)).collect();
        let new2: Vec<_> = s2.creations.iter().filter(|d| !s1.creations.iter().any(|c| c.text == d.text)).collect();
        let mut creations = Vec::new();
        for c1 in &new1 {
            for c2 in &new2 {
                creations.push(Replacement::object_creation(c1, c2));
            }
        }
        self.apply_greedy(&mut working, target, creations, &mut found)?;

        let mut cross = Vec::new();
        for i1 in &inv1 {
            for c2 in &new2 {
                if shares_operand(i1, &c2.arguments, &c2.type_name) {
                    cross.push(Replacement::invocation_with_creation(i1, c2));
                }
            }
        }
        for c1 in &new1 {
            for i2 in &inv2 {
                if shares_operand(i2, &c1.arguments, &c1.type_name) {
                    cross.push(Replacement::creation_with_invocation(c1, i2));
                }
            }
        }
        self.apply_greedy(&mut working, target, cross, &mut found)?;

        if working == target {
            trace!(before = %s1.text, after = %s2.text, count = found.len(), "statements matched with replacements");
            return Ok(Some(found));
        }

        if let Some(intersection) = concatenation_intersection(&working, target) {
            found.insert(intersection);
            return Ok(Some(found));
        }
        Ok(None)
    }

    /// Same name, a close name, the same explicit receiver, or a bare call
    /// renamed with its arguments intact.
    fn related_calls(&self, i1: &Invocation, i2: &Invocation) -> bool {
        let same_receiver = i1.expression.is_some() && i1.identical_expression(i2);
        i1.identical_name(i2)
            || same_receiver
            || (!i1.arguments.is_empty() && i1.renamed_with_identical_expression_and_arguments(i2))
            || normalized_edit_distance(&i1.name, &i2.name) <= self.ctx.max_name_distance
    }

    /// Argument lists of the same call where one argument became several new
    /// variables (split) or several old ones became one new variable (merge).
    fn split_and_merge(&self, s1: &Statement, s2: &Statement, working: &mut String, found: &mut ReplacementSet) {
        for i1 in &s1.invocations {
            for i2 in &s2.invocations {
                if !(i1.identical_name(i2) && i1.identical_expression(i2)) || i1.arguments.len() == i2.arguments.len() {
                    continue;
                }
                let prefix = i1.arguments.iter().zip(&i2.arguments).take_while(|(a, b)| a == b).count();
                let suffix = i1.arguments[prefix..]
                    .iter()
                    .rev()
                    .zip(i2.arguments[prefix..].iter().rev())
                    .take_while(|(a, b)| a == b)
                    .count();
                let middle1 = &i1.arguments[prefix..i1.arguments.len() - suffix];
                let middle2 = &i2.arguments[prefix..i2.arguments.len() - suffix];

                let replacement = match (middle1, middle2) {
                    ([old], news)
                        if news.len() > 1
                            && self.ctx.removed_variables.contains(old)
                            && news.iter().all(|n| self.ctx.new_variables.contains(n)) =>
                    {
                        Replacement::split_variable(SplitVariableReplacement::new(old, news.iter().cloned()))
                    }
                    (olds, [new])
                        if olds.len() > 1
                            && self.ctx.new_variables.contains(new)
                            && olds.iter().all(|o| self.ctx.removed_variables.contains(o)) =>
                    {
                        Replacement::merge_variable(MergeVariableReplacement::new(olds.iter().cloned(), new))
                    }
                    _ => continue,
                };
                *working = replace_identifier(working, &i1.text, &i2.text);
                found.insert(replacement);
            }
        }
    }

    fn apply_greedy(
        &self,
        working: &mut String,
        target: &str,
        mut candidates: Vec<Replacement>,
        found: &mut ReplacementSet,
    ) -> Result<()> {
        candidates.sort_by_key(|r| r.before.len());
        candidates.truncate(self.ctx.max_candidates);
        while !candidates.is_empty() && working != target {
            self.ctx.deadline.check("replacement search")?;
            let current = normalized_edit_distance(working, target);
            let best = candidates
                .iter()
                .enumerate()
                .filter_map(|(i, r)| {
                    let next = replace_identifier(working, &r.before, &r.after);
                    (next != *working).then(|| (i, normalized_edit_distance(&next, target), next))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));
            let Some((index, distance, next)) = best else { break };
            if distance >= current {
                break;
            }
            let accepted = candidates.remove(index);
            candidates.retain(|r| r.before != accepted.before && r.after != accepted.after);
            *working = next;
            found.insert(accepted);
        }
        Ok(())
    }
}

fn only_in(a: &[String], b: &[String]) -> Vec<String> {
    let mut out: Vec<String> = a.iter().filter(|x| !b.contains(x)).cloned().collect();
    out.dedup();
    out
}

fn pairs<F>(left: &[String], right: &[String], make: F) -> Vec<Replacement>
where
    F: Fn(&str, &str) -> Option<Replacement>,
{
    left.iter().flat_map(|a| right.iter().filter_map(|b| make(a, b))).collect()
}

/// `val x: Int` -> `val x: Long` for a declaration of the same name.
fn declared_type_changes(s1: &Statement, s2: &Statement) -> Vec<Replacement> {
    let mut out = Vec::new();
    for d1 in &s1.variable_declarations {
        for d2 in &s2.variable_declarations {
            if d1.name != d2.name {
                continue;
            }
            if let (Some(t1), Some(t2)) = (&d1.ty, &d2.ty) {
                if !t1.equals_qualified(t2) {
                    out.push(Replacement::plain(&t1.to_string(), &t2.to_string(), ReplacementKind::Type));
                }
            }
        }
    }
    out
}

/// A call and a construction are related when one's receiver or arguments
/// reappear in the other, or the call name echoes the constructed type
/// (`build` / `Builder`).
fn shares_operand(call: &Invocation, arguments: &[String], type_name: &str) -> bool {
    let receiver_reused = call.expression.as_ref().is_some_and(|e| arguments.contains(e));
    let argument_reused = call.arguments.iter().any(|a| arguments.contains(a));
    let lower_type = type_name.to_lowercase();
    let name_echoed = !call.name.is_empty() && lower_type.contains(&call.name.to_lowercase());
    receiver_reused || argument_reused || name_echoed
}

/// Two string concatenations inside otherwise identical statements that
/// still share at least half of their operands.
fn concatenation_intersection(before: &str, after: &str) -> Option<Replacement> {
    let (head1, ops1, tail1) = concatenation(before)?;
    let (head2, ops2, tail2) = concatenation(after)?;
    if head1 != head2 || tail1 != tail2 {
        return None;
    }
    let common: BTreeSet<String> = ops1.iter().filter(|o| ops2.contains(o)).map(|o| o.to_string()).collect();
    if common.is_empty() || common.len() * 2 < ops1.len().max(ops2.len()) {
        return None;
    }
    Some(Replacement::intersection(before, after, common, ReplacementKind::Concatenation))
}

/// `log("id=" + id + suffix)` -> (`log(`, [`"id="`, `id`, `suffix`], `)`).
fn concatenation(text: &str) -> Option<(&str, Vec<&str>, &str)> {
    let pieces: Vec<&str> = text.split(" + ").collect();
    let (first, last) = match pieces.as_slice() {
        [first, .., last] => (*first, *last),
        _ => return None,
    };
    let head_end = match outside_literals(first).filter(|&(_, c)| matches!(c, '(' | '=' | ',')).last() {
        Some((i, _)) => i + 1,
        None if first.starts_with("return ") => "return ".len(),
        None => 0,
    };
    let tail_start =
        outside_literals(last).find(|&(_, c)| matches!(c, ')' | ',' | ';')).map_or(last.len(), |(i, _)| i);

    let mut operands = Vec::with_capacity(pieces.len());
    operands.push(first[head_end..].trim());
    operands.extend(pieces[1..pieces.len() - 1].iter().map(|p| p.trim()));
    operands.push(last[..tail_start].trim());
    Some((first[..head_end].trim_end(), operands, &last[tail_start..]))
}

/// Characters of `text` that are not inside a string literal.
fn outside_literals(text: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut in_string = false;
    let mut escaped = false;
    text.char_indices().filter(move |&(_, c)| {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            false
        } else if c == '"' {
            in_string = true;
            false
        } else {
            true
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{ObjectCreation, VariableDeclaration};
    use crate::replacement::ReplacementDetail;

    fn matcher<'a>(deadline: &'a Deadline, new: &'a BTreeSet<String>, removed: &'a BTreeSet<String>) -> StatementMatcher<'a> {
        StatementMatcher::new(MatchContext {
            deadline,
            max_candidates: 50,
            max_name_distance: 0.4,
            new_variables: new,
            removed_variables: removed,
        })
    }

    #[test]
    fn identical_statements_need_no_evidence() {
        let d = Deadline::unbounded();
        let empty = BTreeSet::new();
        let m = matcher(&d, &empty, &empty);
        let s = Statement::new("return x");
        assert_eq!(m.find_replacements(&s, &s.clone()).unwrap(), Some(ReplacementSet::new()));
    }

    #[test]
    fn builder_call_becomes_constructor() {
        let d = Deadline::unbounded();
        let empty = BTreeSet::new();
        let m = matcher(&d, &empty, &empty);
        let s1 = Statement::new("val x = a.build()")
            .uses(&["a"])
            .declares(VariableDeclaration::new("x", None, Some("a.build()")))
            .invokes(Invocation::new(Some("a"), "build", &[]));
        let s2 = Statement::new("val x = Builder(a)")
            .uses(&["a"])
            .declares(VariableDeclaration::new("x", None, Some("Builder(a)")))
            .creates(ObjectCreation::new("Builder", &["a"]));
        let found = m.find_replacements(&s1, &s2).unwrap().expect("statements should match");
        assert_eq!(found.len(), 1);
        let r = found.iter().next().unwrap();
        assert_eq!(r.kind, ReplacementKind::BuilderReplacedWithClassInstanceCreation);
    }

    #[test]
    fn renamed_variable() {
        let d = Deadline::unbounded();
        let empty = BTreeSet::new();
        let m = matcher(&d, &empty, &empty);
        let s1 = Statement::new("send(payload)").uses(&["payload"]).invokes(Invocation::new(None, "send", &["payload"]));
        let s2 = Statement::new("send(message)").uses(&["message"]).invokes(Invocation::new(None, "send", &["message"]));
        let found = m.find_replacements(&s1, &s2).unwrap().unwrap();
        assert!(found.contains(&Replacement::variable_name("payload", "message")));
    }

    #[test]
    fn argument_split_into_new_variables() {
        let d = Deadline::unbounded();
        let new: BTreeSet<String> = ["dataHeader", "dataBody"].iter().map(|s| s.to_string()).collect();
        let removed: BTreeSet<String> = ["data".to_string()].into_iter().collect();
        let m = matcher(&d, &new, &removed);
        let s1 = Statement::new("consume(data)").uses(&["data"]).invokes(Invocation::new(None, "consume", &["data"]));
        let s2 = Statement::new("consume(dataHeader, dataBody)")
            .uses(&["dataHeader", "dataBody"])
            .invokes(Invocation::new(None, "consume", &["dataHeader", "dataBody"]));
        let found = m.find_replacements(&s1, &s2).unwrap().unwrap();
        let split = found.iter().find_map(|r| r.as_split_variable()).expect("split evidence");
        assert_eq!(split.old_variable, "data");
        assert_eq!(split.split_variables.len(), 2);
    }

    #[test]
    fn unrelated_statements_do_not_match() {
        let d = Deadline::unbounded();
        let empty = BTreeSet::new();
        let m = matcher(&d, &empty, &empty);
        let s1 = Statement::new("log(x)").uses(&["x"]).invokes(Invocation::new(None, "log", &["x"]));
        let s2 = Statement::new("return repository.findAll()").invokes(Invocation::new(Some("repository"), "findAll", &[]));
        assert_eq!(m.find_replacements(&s1, &s2).unwrap(), None);
    }

    #[test]
    fn concatenations_keep_common_operands() {
        let r = concatenation_intersection("\"id=\" + id + suffix", "\"id=\" + id + other").unwrap();
        let ReplacementDetail::Intersection { common } = &r.detail else { panic!("expected intersection") };
        assert_eq!(common.len(), 2);
    }

    #[test]
    fn concatenation_must_sit_in_the_same_statement() {
        let r = concatenation_intersection("log(\"a\" + b + c)", "log(\"a\" + b + d)").unwrap();
        let ReplacementDetail::Intersection { common } = &r.detail else { panic!("expected intersection") };
        assert_eq!(common.iter().map(String::as_str).collect::<Vec<_>>(), vec!["\"a\"", "b"]);

        assert!(concatenation_intersection("log(\"a\" + b + c)", "warn(\"a\" + b + c)").is_none());
        assert!(concatenation_intersection("return x + y", "throw x + y").is_none());
        assert!(concatenation_intersection("val s = \"k=\" + v + w", "val t = \"k=\" + v + w").is_none());
        assert!(concatenation_intersection("log(\"a\" + b)", "log(\"a\" + b, level)").is_none());
    }

    #[test]
    fn split_rewrites_whole_calls_only() {
        let d = Deadline::unbounded();
        let new: BTreeSet<String> = ["dataHeader", "dataBody"].iter().map(|s| s.to_string()).collect();
        let removed: BTreeSet<String> = ["data".to_string()].into_iter().collect();
        let m = matcher(&d, &new, &removed);
        let s1 = Statement::new("check(data) && recheck(data)")
            .uses(&["data"])
            .invokes(Invocation::new(None, "check", &["data"]))
            .invokes(Invocation::new(None, "recheck", &["data"]));
        let s2 = Statement::new("check(dataHeader, dataBody) && recheck(data)")
            .uses(&["dataHeader", "dataBody", "data"])
            .invokes(Invocation::new(None, "check", &["dataHeader", "dataBody"]))
            .invokes(Invocation::new(None, "recheck", &["data"]));
        let found = m.find_replacements(&s1, &s2).unwrap().expect("the split explains the change");
        assert!(found.iter().any(|r| r.as_split_variable().is_some()));
    }
}
