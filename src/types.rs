//! types.rs
//! Structural type descriptors and the compatibility predicates the matchers
//! rely on.
//!
//! A type is one of three kinds: a leaf (`List<String>[]`), a composite
//! (`Outer.Inner` where the qualifier itself carries type information) or a
//! function type (`Recv.(A, B) -> R`). Every predicate matches on both kinds at
//! once; two types of different kinds are never equal and never compatible.
//!
//! Equality here is *value* equality: qualification is ignored and
//! wildcard arguments are tolerated, so it is not transitive and
//! `UmlType` does not implement `Eq` or `Hash`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::similarity::camel_case_tokens;

const WILDCARDS: [&str; 2] = ["?", "*"];
const TOP_TYPES: [&str; 3] = ["Object", "Any", "Any?"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Leaf,
    Composite,
    Function,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", from = "TypeRepr")]
pub enum UmlType {
    Leaf(LeafType),
    Composite(CompositeType),
    Function(FunctionType),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafType {
    pub class_type: String, // as written, possibly qualified
    #[serde(default)]
    pub array_dimension: usize,
    #[serde(default)]
    pub type_arguments: Vec<UmlType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeType {
    pub left: Box<UmlType>,
    pub right: LeafType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionType {
    #[serde(default)]
    pub receiver: Option<Box<UmlType>>,
    pub return_type: Box<UmlType>,
    #[serde(default)]
    pub parameters: Vec<UmlType>,
}

/// Models may spell a type either as plain text or as the tagged structure.
#[derive(Deserialize)]
#[serde(untagged)]
enum TypeRepr {
    Text(String),
    Tagged(TaggedType),
}

#[derive(Deserialize)]
#[serde(tag = "kind")]
enum TaggedType {
    Leaf(LeafType),
    Composite(CompositeType),
    Function(FunctionType),
}

impl From<TypeRepr> for UmlType {
    fn from(repr: TypeRepr) -> Self {
        match repr {
            TypeRepr::Text(text) => UmlType::parse(&text),
            TypeRepr::Tagged(TaggedType::Leaf(l)) => UmlType::Leaf(l),
            TypeRepr::Tagged(TaggedType::Composite(c)) => UmlType::Composite(c),
            TypeRepr::Tagged(TaggedType::Function(f)) => UmlType::Function(f),
        }
    }
}

impl LeafType {
    pub fn new(class_type: impl Into<String>) -> Self {
        Self { class_type: class_type.into(), array_dimension: 0, type_arguments: Vec::new() }
    }

    /// `java.util.Map.Entry` -> `Map.Entry`, `pkg1.Base` -> `Base`.
    pub fn non_qualified_name(&self) -> &str {
        simple_name_of(&self.class_type)
    }

    pub fn is_parameterized(&self) -> bool {
        !self.type_arguments.is_empty()
    }

    fn is_sole_wildcard(&self) -> bool {
        matches!(self.type_arguments.as_slice(), [UmlType::Leaf(l)] if l.is_wildcard())
    }

    fn is_sole_top_type(&self) -> bool {
        matches!(self.type_arguments.as_slice(), [UmlType::Leaf(l)] if l.is_top_type())
    }

    fn is_wildcard(&self) -> bool {
        WILDCARDS.contains(&self.class_type.as_str())
    }

    fn is_top_type(&self) -> bool {
        TOP_TYPES.contains(&self.non_qualified_name())
    }

    /// Any type argument, at any nesting depth, with this simple name.
    fn contains_type_argument(&self, name: &str) -> bool {
        self.type_arguments.iter().any(|arg| match arg {
            UmlType::Leaf(l) => l.non_qualified_name() == name || l.contains_type_argument(name),
            other => other.to_string() == name,
        })
    }

    fn equal_type_arguments(&self, other: &LeafType) -> bool {
        if (self.is_sole_wildcard() && other.is_parameterized())
            || (other.is_sole_wildcard() && self.is_parameterized())
        {
            return true;
        }
        if (self.is_sole_top_type() && other.contains_type_argument_top())
            || (other.is_sole_top_type() && self.contains_type_argument_top())
        {
            return true;
        }
        self.type_arguments.len() == other.type_arguments.len()
            && self.type_arguments.iter().zip(&other.type_arguments).all(|(a, b)| a == b)
    }

    fn contains_type_argument_top(&self) -> bool {
        TOP_TYPES.iter().any(|t| self.contains_type_argument(t))
    }

    fn equal_type_arguments_and_dimension(&self, other: &LeafType) -> bool {
        self.array_dimension == other.array_dimension && self.equal_type_arguments(other)
    }

    fn equal_type_arguments_and_dimension_for_sub_type(&self, other: &LeafType) -> bool {
        if self.array_dimension != other.array_dimension {
            return false;
        }
        if (self.is_sole_wildcard() && !other.is_parameterized())
            || (other.is_sole_wildcard() && !self.is_parameterized())
        {
            return true;
        }
        self.equal_type_arguments(other)
    }

    fn first_or_last_token_match(&self, other: &LeafType) -> bool {
        let t1 = camel_case_tokens(self.non_qualified_name());
        let t2 = camel_case_tokens(other.non_qualified_name());
        match (t1.first(), t2.first(), t1.last(), t2.last()) {
            (Some(f1), Some(f2), Some(l1), Some(l2)) => f1 == f2 || l1 == l2,
            _ => false,
        }
    }

    fn common_token(&self, other: &LeafType) -> bool {
        let t1 = camel_case_tokens(self.non_qualified_name());
        let t2 = camel_case_tokens(other.non_qualified_name());
        t1.iter().any(|a| {
            t2.iter().any(|b| {
                (a == b && a.chars().count() > 1) || *a == format!("{b}s") || *b == format!("{a}s")
            })
        })
    }

    fn compatible(&self, other: &LeafType) -> bool {
        let (n1, n2) = (self.class_type.as_str(), other.class_type.as_str());
        n1 == n2
            || self.is_top_type()
            || other.is_top_type()
            || n1.starts_with(n2)
            || n2.starts_with(n1)
            || n1.ends_with(n2)
            || n2.ends_with(n1)
            || self.contains_type_argument(other.non_qualified_name())
            || other.contains_type_argument(self.non_qualified_name())
            || self.common_token(other)
    }

    fn arguments_to_string(&self, qualified: bool) -> String {
        if self.type_arguments.is_empty() {
            return String::new();
        }
        let args: Vec<String> = self
            .type_arguments
            .iter()
            .map(|a| if qualified { a.to_qualified_string() } else { a.to_string() })
            .collect();
        format!("<{}>", args.join(", "))
    }

    fn render(&self, qualified: bool) -> String {
        let name = if qualified { self.class_type.as_str() } else { self.non_qualified_name() };
        format!("{}{}{}", name, self.arguments_to_string(qualified), "[]".repeat(self.array_dimension))
    }
}

impl PartialEq for LeafType {
    fn eq(&self, other: &Self) -> bool {
        self.non_qualified_name() == other.non_qualified_name()
            && self.equal_type_arguments_and_dimension(other)
    }
}

fn simple_name_of(name: &str) -> &str {
    let mut rest = name;
    while let Some(dot) = rest.find('.') {
        let segment = &rest[..dot];
        if segment.chars().next().is_some_and(|c| c.is_lowercase()) {
            rest = &rest[dot + 1..];
        } else {
            break;
        }
    }
    rest
}

impl UmlType {
    pub fn leaf(class_type: impl Into<String>) -> Self {
        UmlType::Leaf(LeafType::new(class_type))
    }

    pub fn composite(left: UmlType, right: LeafType) -> Self {
        UmlType::Composite(CompositeType { left: Box::new(left), right })
    }

    pub fn function(receiver: Option<UmlType>, return_type: UmlType, parameters: Vec<UmlType>) -> Self {
        UmlType::Function(FunctionType {
            receiver: receiver.map(Box::new),
            return_type: Box::new(return_type),
            parameters,
        })
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            UmlType::Leaf(_) => TypeKind::Leaf,
            UmlType::Composite(_) => TypeKind::Composite,
            UmlType::Function(_) => TypeKind::Function,
        }
    }

    /// Class name as written; for a composite, the rightmost part.
    pub fn class_type(&self) -> String {
        match self {
            UmlType::Leaf(l) => l.class_type.clone(),
            UmlType::Composite(c) => c.right.class_type.clone(),
            UmlType::Function(_) => self.to_qualified_string(),
        }
    }

    pub fn array_dimension(&self) -> usize {
        match self {
            UmlType::Leaf(l) => l.array_dimension,
            UmlType::Composite(c) => c.right.array_dimension,
            UmlType::Function(_) => 0,
        }
    }

    /// Strictest comparison: same kind and fully-qualified equality.
    pub fn equals_qualified(&self, other: &UmlType) -> bool {
        match (self, other) {
            (UmlType::Leaf(a), UmlType::Leaf(b)) => {
                a.class_type == b.class_type && a.equal_type_arguments_and_dimension(b)
            }
            (UmlType::Composite(a), UmlType::Composite(b)) => {
                a.left.equals_qualified(&b.left)
                    && UmlType::Leaf(a.right.clone()).equals_qualified(&UmlType::Leaf(b.right.clone()))
            }
            (UmlType::Function(a), UmlType::Function(b)) => {
                let receivers = match (&a.receiver, &b.receiver) {
                    (Some(r1), Some(r2)) => r1.equals_qualified(r2),
                    (None, None) => true,
                    _ => false,
                };
                receivers
                    && a.return_type.equals_qualified(&b.return_type)
                    && a.parameters.len() == b.parameters.len()
                    && a.parameters.iter().zip(&b.parameters).all(|(x, y)| x.equals_qualified(y))
            }
            _ => false,
        }
    }

    /// Same kind and same class name ignoring qualification; type arguments
    /// are not consulted.
    pub fn equal_class_type(&self, other: &UmlType) -> bool {
        match (self, other) {
            (UmlType::Leaf(a), UmlType::Leaf(b)) => a.non_qualified_name() == b.non_qualified_name(),
            (UmlType::Composite(a), UmlType::Composite(b)) => {
                a.right.non_qualified_name() == b.right.non_qualified_name()
            }
            (UmlType::Function(_), UmlType::Function(_)) => self == other,
            _ => false,
        }
    }

    /// Looser than [`UmlType::equal_class_type`]: top types, shared name
    /// prefixes/suffixes and shared camel-case words all count.
    pub fn compatible_types(&self, other: &UmlType) -> bool {
        match (self, other) {
            (UmlType::Leaf(a), UmlType::Leaf(b)) => a.compatible(b),
            (UmlType::Composite(a), UmlType::Composite(b)) => {
                a.left.compatible_types(&b.left) && a.right.compatible(&b.right)
            }
            (UmlType::Function(_), UmlType::Function(_)) => self == other,
            _ => false,
        }
    }

    /// Tolerates one side being a specialisation of the other: the first or
    /// last camel-case word must match, and a sole wildcard argument also
    /// matches an unparameterized type.
    pub fn equals_with_sub_type(&self, other: &UmlType) -> bool {
        match (self, other) {
            (UmlType::Leaf(a), UmlType::Leaf(b)) => {
                a.first_or_last_token_match(b) && a.equal_type_arguments_and_dimension_for_sub_type(b)
            }
            (UmlType::Composite(a), UmlType::Composite(b)) => {
                a.left == b.left
                    && a.right.first_or_last_token_match(&b.right)
                    && a.right.equal_type_arguments_and_dimension_for_sub_type(&b.right)
            }
            (UmlType::Function(_), UmlType::Function(_)) => self == other,
            _ => false,
        }
    }

    pub fn to_qualified_string(&self) -> String {
        match self {
            UmlType::Leaf(l) => l.render(true),
            UmlType::Composite(c) => format!("{}.{}", c.left.to_qualified_string(), c.right.render(true)),
            UmlType::Function(f) => {
                let params: Vec<String> = f.parameters.iter().map(|p| p.to_qualified_string()).collect();
                let receiver = f
                    .receiver
                    .as_ref()
                    .map(|r| format!("{}.", r.to_qualified_string()))
                    .unwrap_or_default();
                format!("{}({}) -> {}", receiver, params.join(", "), f.return_type.to_qualified_string())
            }
        }
    }

    /// Reads a type as written in source: `Map<String, List<Int>>[]`,
    /// `(Int, String) -> Unit`, `Context.() -> Unit`. Malformed input degrades
    /// to a leaf holding the raw text.
    pub fn parse(text: &str) -> UmlType {
        let text = text.trim();
        if let Some(arrow) = find_top_level(text, "->") {
            let (lhs, rhs) = (text[..arrow].trim(), text[arrow + 2..].trim());
            if let Some(open) = matching_open_paren(lhs) {
                let receiver = lhs[..open].trim().strip_suffix('.').map(UmlType::parse);
                let parameters = split_top_level(&lhs[open + 1..lhs.len() - 1])
                    .into_iter()
                    .map(UmlType::parse)
                    .collect();
                return UmlType::function(receiver, UmlType::parse(rhs), parameters);
            }
        }

        let mut body = text;
        let mut array_dimension = 0;
        while let Some(stripped) = body.strip_suffix("[]") {
            array_dimension += 1;
            body = stripped.trim_end();
        }
        if let Some(open) = body.find('<').filter(|_| body.ends_with('>')) {
            let type_arguments = split_top_level(&body[open + 1..body.len() - 1])
                .into_iter()
                .map(UmlType::parse)
                .collect();
            return UmlType::Leaf(LeafType {
                class_type: body[..open].trim().to_string(),
                array_dimension,
                type_arguments,
            });
        }
        UmlType::Leaf(LeafType { class_type: body.to_string(), array_dimension, type_arguments: Vec::new() })
    }
}

impl PartialEq for UmlType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (UmlType::Leaf(a), UmlType::Leaf(b)) => a == b,
            (UmlType::Composite(a), UmlType::Composite(b)) => a.left == b.left && a.right == b.right,
            (UmlType::Function(a), UmlType::Function(b)) => {
                a.receiver == b.receiver && a.return_type == b.return_type && a.parameters == b.parameters
            }
            _ => false,
        }
    }
}

impl fmt::Display for UmlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UmlType::Leaf(l) => write!(f, "{}", l.render(false)),
            UmlType::Composite(c) => write!(f, "{}.{}", c.left, c.right.render(false)),
            UmlType::Function(func) => {
                if let Some(r) = &func.receiver {
                    write!(f, "{r}.")?;
                }
                let params: Vec<String> = func.parameters.iter().map(|p| p.to_string()).collect();
                write!(f, "({}) -> {}", params.join(", "), func.return_type)
            }
        }
    }
}

/// Byte offset of `needle` outside any `<>`/`()` nesting.
fn find_top_level(text: &str, needle: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' if !text[..i].ends_with('-') => depth -= 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && text[i..].starts_with(needle) {
            return Some(i);
        }
    }
    None
}

/// Index of the `(` closing at the final `)` of `text`.
fn matching_open_paren(text: &str) -> Option<usize> {
    if !text.ends_with(')') {
        return None;
    }
    let mut depth = 0i32;
    for (i, c) in text.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on commas that are not nested inside `<>` or `()`.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_generic_array() {
        let t = UmlType::parse("java.util.Map<String, List<Int>>[]");
        let UmlType::Leaf(leaf) = &t else { panic!("expected leaf") };
        assert_eq!(leaf.class_type, "java.util.Map");
        assert_eq!(leaf.array_dimension, 1);
        assert_eq!(leaf.type_arguments.len(), 2);
        assert_eq!(t.to_string(), "Map<String, List<Int>>[]");
        assert_eq!(t.to_qualified_string(), "java.util.Map<String, List<Int>>[]");
    }

    #[test]
    fn parse_function_type() {
        let t = UmlType::parse("Context.(Int, String) -> Unit");
        assert_eq!(t.kind(), TypeKind::Function);
        assert_eq!(t.to_string(), "Context.(Int, String) -> Unit");
    }

    #[test]
    fn qualification_is_ignored_by_value_equality() {
        let a = UmlType::parse("pkg1.Base");
        let b = UmlType::parse("pkg2.Base");
        assert_eq!(a, b);
        assert!(!a.equals_qualified(&b));
        assert!(a.equal_class_type(&b));
    }

    #[test]
    fn different_kinds_are_never_equal() {
        let leaf = UmlType::leaf("Unit");
        let func = UmlType::function(None, UmlType::leaf("Unit"), vec![]);
        let comp = UmlType::composite(UmlType::leaf("Outer"), LeafType::new("Unit"));
        assert_ne!(leaf, func);
        assert_ne!(leaf, comp);
        assert!(!leaf.compatible_types(&func));
        assert!(!comp.equals_qualified(&leaf));
    }

    #[test]
    fn wildcard_argument_matches_any_parameterization() {
        let a = UmlType::parse("List<?>");
        let b = UmlType::parse("List<String>");
        assert_eq!(a, b);
        let star = UmlType::parse("List<*>");
        assert_eq!(star, b);
    }

    #[test]
    fn sole_top_type_matches_containing_parameterization() {
        let a = UmlType::parse("List<Any>");
        let b = UmlType::parse("List<Map<String, Any>>");
        assert_eq!(a, b);
        let c = UmlType::parse("List<String>");
        assert_ne!(a, c);
    }

    #[test]
    fn sub_type_tolerates_partial_inference() {
        let a = UmlType::parse("ArrayList<?>");
        let b = UmlType::parse("List");
        assert!(a.equals_with_sub_type(&b));
        assert!(!a.equals_with_sub_type(&UmlType::parse("Set")));
    }

    #[test]
    fn compatible_types_share_camel_words() {
        assert!(UmlType::leaf("UserRepository").compatible_types(&UmlType::leaf("UserStore")));
        assert!(UmlType::leaf("Any").compatible_types(&UmlType::leaf("Request")));
        assert!(UmlType::leaf("Item").compatible_types(&UmlType::leaf("Items")));
        assert!(!UmlType::leaf("Int").compatible_types(&UmlType::leaf("String")));
    }

    #[test]
    fn deserializes_from_text_or_tagged() {
        let text: UmlType = serde_json::from_str(r#""List<String>""#).unwrap();
        let tagged: UmlType =
            serde_json::from_str(r#"{"kind":"Leaf","class_type":"List","type_arguments":["String"]}"#).unwrap();
        assert!(text.equals_qualified(&tagged));
    }
}
