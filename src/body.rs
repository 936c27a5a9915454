//! body.rs
//! Operation bodies as the parser collaborator hands them over: a statement
//! tree where every statement already carries the variables, calls,
//! constructions and declarations found inside it.

use serde::{Deserialize, Serialize};

use crate::location::{CodeElementType, LocationInfo};
use crate::types::UmlType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationBody {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatementKind {
    #[default]
    Leaf,
    Composite, // if / for / while / when / try / block
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Statement {
    pub text: String, // normalized source text; for composites, the header only
    pub kind: StatementKind,
    pub location: LocationInfo,
    pub variables: Vec<String>,
    pub variable_declarations: Vec<VariableDeclaration>,
    pub invocations: Vec<Invocation>,
    pub creations: Vec<ObjectCreation>,
    pub string_literals: Vec<String>,
    pub number_literals: Vec<String>,
    pub children: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    #[serde(default, rename = "type")]
    pub ty: Option<UmlType>,
    #[serde(default)]
    pub initializer: Option<String>,
    #[serde(default)]
    pub location: LocationInfo,
}

/// A call `expression.name(arguments)` found inside a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invocation {
    pub text: String,
    #[serde(default)]
    pub expression: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub location: LocationInfo,
}

/// A constructor call `Type(arguments)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectCreation {
    pub text: String,
    pub type_name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub location: LocationInfo,
}

impl Invocation {
    pub fn new(expression: Option<&str>, name: &str, arguments: &[&str]) -> Self {
        let receiver = expression.map(|e| format!("{e}.")).unwrap_or_default();
        Self {
            text: format!("{}{}({})", receiver, name, arguments.join(", ")),
            expression: expression.map(str::to_string),
            name: name.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
            location: LocationInfo::default().with_element_type(CodeElementType::MethodInvocation),
        }
    }

    pub fn identical_expression(&self, other: &Invocation) -> bool {
        self.expression == other.expression
    }

    pub fn identical_name(&self, other: &Invocation) -> bool {
        self.name == other.name
    }

    pub fn equal_arguments(&self, other: &Invocation) -> bool {
        self.arguments == other.arguments
    }

    /// Arguments present, as text, in both calls.
    pub fn argument_intersection(&self, other: &Invocation) -> Vec<String> {
        self.arguments.iter().filter(|a| other.arguments.contains(a)).cloned().collect()
    }

    /// Same receiver and arguments, different name.
    pub fn renamed_with_identical_expression_and_arguments(&self, other: &Invocation) -> bool {
        !self.identical_name(other) && self.identical_expression(other) && self.equal_arguments(other)
    }

    pub fn arguments_differ_only_by_count(&self, other: &Invocation) -> bool {
        self.identical_name(other)
            && self.identical_expression(other)
            && self.arguments.len() != other.arguments.len()
    }
}

impl ObjectCreation {
    pub fn new(type_name: &str, arguments: &[&str]) -> Self {
        Self {
            text: format!("{}({})", type_name, arguments.join(", ")),
            type_name: type_name.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
            location: LocationInfo::default().with_element_type(CodeElementType::ClassInstanceCreation),
        }
    }
}

impl VariableDeclaration {
    pub fn new(name: &str, ty: Option<&str>, initializer: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.map(UmlType::parse),
            initializer: initializer.map(str::to_string),
            location: LocationInfo::default().with_element_type(CodeElementType::VariableDeclarationStatement),
        }
    }

    /// `name : Type` as used in refactoring descriptions.
    pub fn describe(&self) -> String {
        match &self.ty {
            Some(t) => format!("{} : {}", self.name, t),
            None => self.name.clone(),
        }
    }
}

impl Statement {
    pub fn new(text: &str) -> Self {
        Self { text: text.to_string(), ..Default::default() }
    }

    pub fn composite(text: &str, children: Vec<Statement>) -> Self {
        let mut s = Self::new(text);
        s.kind = StatementKind::Composite;
        s.children = children;
        s
    }

    pub fn at(mut self, location: LocationInfo) -> Self {
        self.location = location;
        self
    }

    pub fn uses(mut self, variables: &[&str]) -> Self {
        self.variables.extend(variables.iter().map(|v| v.to_string()));
        self
    }

    pub fn declares(mut self, declaration: VariableDeclaration) -> Self {
        if !self.variables.contains(&declaration.name) {
            self.variables.push(declaration.name.clone());
        }
        self.variable_declarations.push(declaration);
        self
    }

    pub fn invokes(mut self, invocation: Invocation) -> Self {
        self.invocations.push(invocation);
        self
    }

    pub fn creates(mut self, creation: ObjectCreation) -> Self {
        self.creations.push(creation);
        self
    }

    pub fn is_composite(&self) -> bool {
        self.kind == StatementKind::Composite
    }
}

/// One statement of a flattened body, addressed by its pre-order index.
#[derive(Debug, Clone, Copy)]
pub struct FlatStatement<'a> {
    pub index: usize,
    pub depth: usize,
    pub parent: Option<usize>,
    pub statement: &'a Statement,
}

impl OperationBody {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Pre-order walk recording nesting depth and parent index.
    pub fn flatten(&self) -> Vec<FlatStatement<'_>> {
        fn walk<'a>(stmts: &'a [Statement], depth: usize, parent: Option<usize>, out: &mut Vec<FlatStatement<'a>>) {
            for s in stmts {
                let index = out.len();
                out.push(FlatStatement { index, depth, parent, statement: s });
                walk(&s.children, depth + 1, Some(index), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.statements, 0, None, &mut out);
        out
    }

    pub fn variable_declarations(&self) -> Vec<&VariableDeclaration> {
        self.flatten().into_iter().flat_map(|f| f.statement.variable_declarations.iter()).collect()
    }

    pub fn invocations(&self) -> Vec<&Invocation> {
        self.flatten().into_iter().flat_map(|f| f.statement.invocations.iter()).collect()
    }

    pub fn declares_variable(&self, name: &str) -> bool {
        self.variable_declarations().iter().any(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_text_is_rendered() {
        let call = Invocation::new(Some("a"), "build", &[]);
        assert_eq!(call.text, "a.build()");
        let bare = Invocation::new(None, "process", &["x", "y"]);
        assert_eq!(bare.text, "process(x, y)");
        assert_eq!(ObjectCreation::new("Builder", &["a"]).text, "Builder(a)");
    }

    #[test]
    fn flatten_tracks_depth_and_parent() {
        let body = OperationBody::new(vec![
            Statement::new("val x = 1"),
            Statement::composite("if (x > 0)", vec![Statement::new("run(x)")]),
        ]);
        let flat = body.flatten();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[2].depth, 1);
        assert_eq!(flat[2].parent, Some(1));
        assert!(flat[1].statement.is_composite());
    }

    #[test]
    fn call_comparisons() {
        let a = Invocation::new(Some("svc"), "load", &["id"]);
        let b = Invocation::new(Some("svc"), "fetch", &["id"]);
        assert!(a.renamed_with_identical_expression_and_arguments(&b));
        assert_eq!(a.argument_intersection(&b), vec!["id".to_string()]);
    }
}
