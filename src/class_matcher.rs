//! class_matcher.rs
//! Strategies that pair a removed class with an added one. Each strategy is a
//! name condition plus a member condition; the differ runs them strict to
//! loose and a class is consumed by the first one that accepts it.

use std::cmp::Ordering;
use std::fmt;

use crate::model::{Class, last_segment};
use crate::similarity::normalized_edit_distance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Same, // move family
    Any,  // rename family
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemberMatch {
    Identical,
    Relaxed,
    ExtremelyRelaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassMatcher {
    pub name: NameMatch,
    pub members: MemberMatch,
}

impl ClassMatcher {
    pub const MOVE: ClassMatcher = ClassMatcher { name: NameMatch::Same, members: MemberMatch::Identical };
    pub const RENAME: ClassMatcher = ClassMatcher { name: NameMatch::Any, members: MemberMatch::Identical };
    pub const RELAXED_MOVE: ClassMatcher = ClassMatcher { name: NameMatch::Same, members: MemberMatch::Relaxed };
    pub const RELAXED_RENAME: ClassMatcher = ClassMatcher { name: NameMatch::Any, members: MemberMatch::Relaxed };
    pub const EXTREMELY_RELAXED_MOVE: ClassMatcher =
        ClassMatcher { name: NameMatch::Same, members: MemberMatch::ExtremelyRelaxed };
    pub const EXTREMELY_RELAXED_RENAME: ClassMatcher =
        ClassMatcher { name: NameMatch::Any, members: MemberMatch::ExtremelyRelaxed };

    /// Matchers in the order the differ applies them. `RELAXED_MOVE` is not
    /// part of the chain: every pair it accepts `RELAXED_RENAME` accepts too.
    pub fn chain(extremely_relaxed: bool) -> Vec<ClassMatcher> {
        let mut chain = vec![Self::MOVE, Self::RENAME, Self::RELAXED_RENAME];
        if extremely_relaxed {
            chain.extend([Self::EXTREMELY_RELAXED_MOVE, Self::EXTREMELY_RELAXED_RENAME]);
        }
        chain
    }

    pub fn is_move(&self) -> bool {
        self.name == NameMatch::Same
    }

    /// Pure predicate. `renamed_file_hint` is where version control says the
    /// removed class's file went; landing there satisfies any member condition.
    pub fn matches(&self, removed: &Class, added: &Class, renamed_file_hint: Option<&str>) -> bool {
        let name_ok = match self.name {
            NameMatch::Same => removed.has_same_name_and_kind(added),
            NameMatch::Any => removed.has_same_kind(added),
        };
        if !name_ok {
            return false;
        }
        if renamed_file_hint == Some(added.source_file.as_str()) {
            return true;
        }
        match self.members {
            MemberMatch::Identical => removed.has_same_attributes_and_operations(added),
            MemberMatch::Relaxed => removed.has_common_attributes_and_operations(added),
            MemberMatch::ExtremelyRelaxed => removed.has_attributes_and_operations_with_common_names(added),
        }
    }

    /// Index of the best added class for `removed`, if any qualifies.
    /// `removed_pool` is every class still unmatched on the left side.
    pub fn select(
        &self,
        removed: &Class,
        added: &[&Class],
        renamed_file_hint: Option<&str>,
        removed_pool: &[&Class],
    ) -> Option<usize> {
        added
            .iter()
            .enumerate()
            .filter(|(_, candidate)| self.matches(removed, candidate, renamed_file_hint))
            .filter(|(_, candidate)| !inner_class_with_same_name(removed, candidate))
            .filter(|(_, candidate)| !conflicting_move_of_top_level_class(removed, candidate, removed_pool))
            .map(|(i, candidate)| (i, self.rank(removed, candidate)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .map(|(i, _)| i)
    }

    fn rank(&self, removed: &Class, added: &Class) -> (f64, f64) {
        match self.name {
            NameMatch::Same => (
                normalized_edit_distance(&removed.source_folder(), &added.source_folder()),
                normalized_edit_distance(&removed.source_file, &added.source_file),
            ),
            NameMatch::Any => (
                normalized_edit_distance(&removed.name, &added.name),
                normalized_edit_distance(&removed.package, &added.package),
            ),
        }
    }
}

impl fmt::Display for ClassMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strength = match self.members {
            MemberMatch::Identical => "",
            MemberMatch::Relaxed => "relaxed ",
            MemberMatch::ExtremelyRelaxed => "extremely relaxed ",
        };
        let family = if self.is_move() { "move" } else { "rename" };
        write!(f, "{strength}{family}")
    }
}

/// A nested class that merely shares the removed class's simple name while
/// sitting in an unrelated enclosing class.
fn inner_class_with_same_name(removed: &Class, added: &Class) -> bool {
    !added.is_top_level && added.name == removed.name && last_segment(&added.package) != last_segment(&removed.package)
}

/// Another removed class with the same simple name has exactly the added
/// class's qualified name; that one owns the match.
fn conflicting_move_of_top_level_class(removed: &Class, added: &Class, removed_pool: &[&Class]) -> bool {
    if !added.is_top_level {
        return false;
    }
    let target = added.qualified_name();
    removed.qualified_name() != target
        && removed_pool
            .iter()
            .any(|other| !std::ptr::eq(*other, removed) && other.name == added.name && other.qualified_name() == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, Operation};

    fn class(package: &str, name: &str, file: &str) -> Class {
        Class::new(package, name, file)
            .with_attribute(Attribute::new("id", "Int"))
            .with_operation(Operation::new("load").with_return("Unit"))
    }

    #[test]
    fn move_requires_same_simple_name() {
        let removed = class("a", "Foo", "src/a/Foo.kt");
        let moved = class("b", "Foo", "src/b/Foo.kt");
        let renamed = class("a", "Bar", "src/a/Bar.kt");
        assert!(ClassMatcher::MOVE.matches(&removed, &moved, None));
        assert!(!ClassMatcher::MOVE.matches(&removed, &renamed, None));
        assert!(ClassMatcher::RENAME.matches(&removed, &renamed, None));
    }

    #[test]
    fn relaxation_widens_acceptance() {
        let removed = class("a", "Foo", "src/a/Foo.kt");
        let grown = class("b", "Foo", "src/b/Foo.kt").with_operation(Operation::new("save"));
        assert!(!ClassMatcher::MOVE.matches(&removed, &grown, None));
        assert!(ClassMatcher::RELAXED_MOVE.matches(&removed, &grown, None));

        let loose = Class::new("b", "Foo", "src/b/Foo.kt").with_attribute(Attribute::new("id", "Long"));
        assert!(!ClassMatcher::RELAXED_MOVE.matches(&removed, &loose, None));
        assert!(ClassMatcher::EXTREMELY_RELAXED_MOVE.matches(&removed, &loose, None));
    }

    #[test]
    fn file_hint_satisfies_member_condition() {
        let removed = class("a", "Foo", "src/a/Foo.kt");
        let rewritten = Class::new("a", "Bar", "src/a/Bar.kt");
        assert!(!ClassMatcher::RENAME.matches(&removed, &rewritten, None));
        assert!(ClassMatcher::RENAME.matches(&removed, &rewritten, Some("src/a/Bar.kt")));
    }

    #[test]
    fn kind_must_agree() {
        let removed = class("a", "Foo", "src/a/Foo.kt");
        let iface = class("a", "Foo", "src/a/Foo.kt").with_kind(crate::model::ClassKind::Interface);
        assert!(!ClassMatcher::MOVE.matches(&removed, &iface, Some("src/a/Foo.kt")));
    }

    #[test]
    fn select_prefers_closest_source_folder() {
        let removed = class("a", "Foo", "app/src/main/kotlin/a/Foo.kt");
        let far = class("b", "Foo", "lib/other/b/Foo.kt");
        let near = class("b", "Foo", "app/src/main/kotlin/b/Foo.kt");
        let pool = [&removed];
        let picked = ClassMatcher::MOVE.select(&removed, &[&far, &near], None, &pool);
        assert_eq!(picked, Some(1));
    }

    #[test]
    fn conflicting_top_level_move_is_skipped() {
        let first = class("a", "Foo", "src/a/Foo.kt");
        let second = class("b", "Foo", "src/b/Foo.kt");
        let added = class("b", "Foo", "src/b/Foo2.kt");
        let pool = [&first, &second];
        assert_eq!(ClassMatcher::MOVE.select(&first, &[&added], None, &pool), None);
        assert_eq!(ClassMatcher::MOVE.select(&second, &[&added], None, &pool), Some(0));
    }

    #[test]
    fn extremely_relaxed_matchers_are_opt_in() {
        assert_eq!(ClassMatcher::chain(false), vec![ClassMatcher::MOVE, ClassMatcher::RENAME, ClassMatcher::RELAXED_RENAME]);
        let extended = ClassMatcher::chain(true);
        assert_eq!(extended.len(), 5);
        assert_eq!(extended[3..], [ClassMatcher::EXTREMELY_RELAXED_MOVE, ClassMatcher::EXTREMELY_RELAXED_RENAME]);
    }

    #[test]
    fn display_names_strength_and_family() {
        assert_eq!(ClassMatcher::RELAXED_RENAME.to_string(), "relaxed rename");
        assert_eq!(ClassMatcher::MOVE.to_string(), "move");
    }
}
