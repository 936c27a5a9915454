//! model.rs
//! The structural model of one revision: classes, their members, inheritance
//! edges and package-level files. Built by the parser collaborator, read-only
//! here.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::body::OperationBody;
use crate::error::{MinerError, Result};
use crate::location::{CodeElementType, LocationInfo};
use crate::types::UmlType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralModel {
    pub classes: Vec<Class>,
    pub generalizations: Vec<Generalization>,
    pub realizations: Vec<Realization>,
    pub files: Vec<SourceFile>,
    pub repository_directories: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    Object,
    Annotation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeParameter {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<UmlType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterDirection {
    #[default]
    In,
    Return,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: UmlType,
    #[serde(default)]
    pub direction: ParameterDirection,
    #[serde(default)]
    pub varargs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: UmlType,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub is_final: bool, // `val`
    #[serde(default)]
    pub initializer: Option<String>,
    #[serde(default)]
    pub location: LocationInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub type_parameters: Vec<TypeParameter>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub location: LocationInfo,
    #[serde(default)]
    pub body: Option<OperationBody>, // None for abstract / interface members
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionObject {
    pub name: Option<String>,
    pub attributes: Vec<Attribute>,
    pub operations: Vec<Operation>,
    pub location: LocationInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    #[serde(default)]
    pub package: String, // enclosing class's qualified name for nested classes
    pub source_file: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_data: bool,
    #[serde(default)]
    pub is_sealed: bool,
    #[serde(default)]
    pub is_inner: bool,
    #[serde(default = "default_true")]
    pub is_top_level: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub location: LocationInfo,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub type_parameters: Vec<TypeParameter>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub superclass: Option<UmlType>,
    #[serde(default)]
    pub companion: Option<CompanionObject>,
}

fn default_true() -> bool {
    true
}

/// Inheritance edge: `child` is the qualified name of a class of the same
/// model, `parent` the supertype name as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generalization {
    pub child: String,
    pub parent: String,
}

/// Interface-implementation edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Realization {
    pub class: String,
    pub interface: String,
}

/// Package-level declarations of one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFile {
    pub path: String,
    pub package: String,
    pub operations: Vec<Operation>,
    pub attributes: Vec<Attribute>,
    pub annotations: Vec<Annotation>,
    pub location: LocationInfo,
}

/// Anything that owns attributes and operations and can be member-diffed:
/// classes and package-level files.
pub trait MemberContainer {
    fn container_name(&self) -> String;
    fn file_path(&self) -> &str;
    fn location(&self) -> &LocationInfo;
    fn annotations(&self) -> &[Annotation];
    fn attributes(&self) -> Vec<&Attribute>;
    fn operations(&self) -> Vec<&Operation>;
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "@{}({})", self.name, v),
            None => write!(f, "@{}", self.name),
        }
    }
}

impl Parameter {
    pub fn new(name: &str, ty: &str) -> Self {
        Self { name: name.to_string(), ty: UmlType::parse(ty), direction: ParameterDirection::In, varargs: false }
    }

    pub fn returning(ty: &str) -> Self {
        Self { name: "return".to_string(), ty: UmlType::parse(ty), direction: ParameterDirection::Return, varargs: false }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dots = if self.varargs { "..." } else { "" };
        write!(f, "{} : {}{}", self.name, self.ty, dots)
    }
}

impl Attribute {
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: UmlType::parse(ty),
            visibility: Visibility::Private,
            class_name: String::new(),
            is_final: true,
            initializer: None,
            location: LocationInfo::default().with_element_type(CodeElementType::FieldDeclaration),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_initializer(mut self, initializer: &str) -> Self {
        self.initializer = Some(initializer.to_string());
        self
    }

    /// Name, type and visibility; the owning class is not compared.
    pub fn same_declaration(&self, other: &Attribute) -> bool {
        self.name == other.name && self.visibility == other.visibility && self.ty == other.ty
    }

    pub fn equals_qualified(&self, other: &Attribute) -> bool {
        self.name == other.name && self.visibility == other.visibility && self.ty.equals_qualified(&other.ty)
    }

    /// Same name and same type after dropping qualifiers.
    pub fn matches_ignoring_owner(&self, other: &Attribute) -> bool {
        self.name == other.name
            && last_segment(&self.ty.class_type()) == last_segment(&other.ty.class_type())
            && self.ty.array_dimension() == other.ty.array_dimension()
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.name, self.ty)
    }
}

impl Operation {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            class_name: String::new(),
            parameters: Vec::new(),
            visibility: Visibility::Public,
            is_abstract: false,
            is_constructor: false,
            type_parameters: Vec::new(),
            annotations: Vec::new(),
            location: LocationInfo::default().with_element_type(CodeElementType::MethodDeclaration),
            body: None,
        }
    }

    pub fn with_parameter(mut self, name: &str, ty: &str) -> Self {
        self.parameters.push(Parameter::new(name, ty));
        self
    }

    pub fn with_return(mut self, ty: &str) -> Self {
        self.parameters.retain(|p| p.direction != ParameterDirection::Return);
        self.parameters.push(Parameter::returning(ty));
        self
    }

    pub fn with_body(mut self, body: OperationBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_annotation(mut self, name: &str, value: Option<&str>) -> Self {
        self.annotations.push(Annotation { name: name.to_string(), value: value.map(str::to_string) });
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn at(mut self, location: LocationInfo) -> Self {
        self.location = location.with_element_type(CodeElementType::MethodDeclaration);
        self
    }

    pub fn input_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.direction == ParameterDirection::In)
    }

    pub fn return_parameter(&self) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.direction == ParameterDirection::Return)
    }

    pub fn parameter_types(&self) -> Vec<&UmlType> {
        self.input_parameters().map(|p| &p.ty).collect()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.input_parameters().map(|p| p.name.as_str()).collect()
    }

    pub fn has_empty_body(&self) -> bool {
        self.body.as_ref().is_none_or(|b| b.is_empty())
    }

    pub fn equal_parameter_types(&self, other: &Operation) -> bool {
        let (a, b) = (self.parameter_types(), other.parameter_types());
        a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x == y)
    }

    pub fn equal_parameter_names(&self, other: &Operation) -> bool {
        self.parameter_names() == other.parameter_names()
    }

    pub fn equal_return_parameter(&self, other: &Operation) -> bool {
        match (self.return_parameter(), other.return_parameter()) {
            (Some(a), Some(b)) => a.ty == b.ty,
            (None, None) => true,
            _ => false,
        }
    }

    fn equal_type_parameters(&self, other: &Operation) -> bool {
        let a: Vec<&str> = self.type_parameters.iter().map(|t| t.name.as_str()).collect();
        let b: Vec<&str> = other.type_parameters.iter().map(|t| t.name.as_str()).collect();
        a == b
    }

    /// Same owner, name, visibility, abstractness, body presence, parameter
    /// types and type parameters.
    pub fn signature_equals(&self, other: &Operation) -> bool {
        self.class_name == other.class_name && self.same_signature(other)
    }

    /// `signature_equals` without the owner, for members of matched classes.
    pub fn same_signature(&self, other: &Operation) -> bool {
        self.name == other.name
            && self.visibility == other.visibility
            && self.is_abstract == other.is_abstract
            && self.has_empty_body() == other.has_empty_body()
            && self.equal_parameter_types(other)
            && self.equal_type_parameters(other)
    }

    pub fn equals_qualified(&self, other: &Operation) -> bool {
        if !(self.class_name == other.class_name
            && self.name == other.name
            && self.visibility == other.visibility
            && self.is_abstract == other.is_abstract
            && self.equal_type_parameters(other))
        {
            return false;
        }
        if let (Some(a), Some(b)) = (self.return_parameter(), other.return_parameter()) {
            if !a.ty.equals_qualified(&b.ty) {
                return false;
            }
        }
        let (a, b) = (self.parameter_types(), other.parameter_types());
        a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x.equals_qualified(y))
    }

    pub fn equals_ignoring_visibility(&self, other: &Operation) -> bool {
        self.class_name == other.class_name
            && self.name == other.name
            && self.is_abstract == other.is_abstract
            && self.has_empty_body() == other.has_empty_body()
            && self.equal_return_parameter(other)
            && self.equal_parameter_types(other)
            && self.equal_type_parameters(other)
    }

    pub fn equals_ignoring_name_case(&self, other: &Operation) -> bool {
        self.class_name == other.class_name
            && self.name.eq_ignore_ascii_case(&other.name)
            && self.visibility == other.visibility
            && self.is_abstract == other.is_abstract
            && self.has_empty_body() == other.has_empty_body()
            && self.equal_return_parameter(other)
            && self.equal_parameter_types(other)
            && self.equal_type_parameters(other)
    }

    /// Same name and parameter types, owner ignored; used when comparing the
    /// member sets of two different classes.
    pub fn matches_ignoring_owner(&self, other: &Operation) -> bool {
        self.name == other.name && self.equal_parameter_types(other)
    }

    /// Display form used in descriptions: `public load(id : Int) : User`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.input_parameters().map(|p| p.to_string()).collect();
        let mut out = format!("{} {}({})", visibility_str(self.visibility), self.name, params.join(", "));
        if let Some(ret) = self.return_parameter() {
            out.push_str(&format!(" : {}", ret.ty));
        }
        out
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

fn visibility_str(v: Visibility) -> &'static str {
    match v {
        Visibility::Public => "public",
        Visibility::Protected => "protected",
        Visibility::Internal => "internal",
        Visibility::Private => "private",
    }
}

pub(crate) fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl Class {
    pub fn new(package: &str, name: &str, source_file: &str) -> Self {
        Self {
            name: name.to_string(),
            package: package.to_string(),
            source_file: source_file.to_string(),
            kind: ClassKind::Class,
            is_abstract: false,
            is_data: false,
            is_sealed: false,
            is_inner: false,
            is_top_level: true,
            visibility: Visibility::Public,
            location: LocationInfo::new(source_file, 1, 1).with_element_type(CodeElementType::TypeDeclaration),
            attributes: Vec::new(),
            operations: Vec::new(),
            type_parameters: Vec::new(),
            annotations: Vec::new(),
            superclass: None,
            companion: None,
        }
    }

    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn nested_in(mut self, outer: &Class) -> Self {
        self.package = outer.qualified_name();
        self.is_top_level = false;
        self
    }

    pub fn with_attribute(mut self, mut attribute: Attribute) -> Self {
        attribute.class_name = self.qualified_name();
        if attribute.location.file_path.is_empty() {
            attribute.location.file_path = self.source_file.clone();
        }
        self.attributes.push(attribute);
        self
    }

    pub fn with_operation(mut self, mut operation: Operation) -> Self {
        operation.class_name = self.qualified_name();
        if operation.location.file_path.is_empty() {
            operation.location.file_path = self.source_file.clone();
        }
        self.operations.push(operation);
        self
    }

    pub fn with_annotation(mut self, name: &str) -> Self {
        self.annotations.push(Annotation { name: name.to_string(), value: None });
        self
    }

    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Cross-revision identity: qualified name, kind and file.
    pub fn same_identity(&self, other: &Class) -> bool {
        self.package == other.package
            && self.name == other.name
            && self.kind == other.kind
            && self.source_file == other.source_file
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Kind, abstractness and type-parameter names.
    pub fn has_same_kind(&self, other: &Class) -> bool {
        let a: Vec<&str> = self.type_parameters.iter().map(|t| t.name.as_str()).collect();
        let b: Vec<&str> = other.type_parameters.iter().map(|t| t.name.as_str()).collect();
        self.kind == other.kind && self.is_abstract == other.is_abstract && a == b
    }

    pub fn has_same_name_and_kind(&self, other: &Class) -> bool {
        self.name == other.name && self.has_same_kind(other)
    }

    pub fn all_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().chain(self.companion.iter().flat_map(|c| c.attributes.iter()))
    }

    pub fn all_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().chain(self.companion.iter().flat_map(|c| c.operations.iter()))
    }

    /// Member sets correspond one-to-one: equal counts and every member has a
    /// same-named, same-typed counterpart.
    pub fn has_same_attributes_and_operations(&self, other: &Class) -> bool {
        let (a1, a2): (Vec<_>, Vec<_>) = (self.all_attributes().collect(), other.all_attributes().collect());
        let (o1, o2): (Vec<_>, Vec<_>) = (self.all_operations().collect(), other.all_operations().collect());
        a1.len() == a2.len()
            && o1.len() == o2.len()
            && a1.iter().all(|a| a2.iter().any(|b| a.matches_ignoring_owner(b)))
            && a2.iter().all(|b| a1.iter().any(|a| a.matches_ignoring_owner(b)))
            && o1.iter().all(|o| o2.iter().any(|p| o.matches_ignoring_owner(p)))
            && o2.iter().all(|p| o1.iter().any(|o| o.matches_ignoring_owner(p)))
    }

    /// At least one shared attribute and one shared operation; a category
    /// empty on both sides counts as shared, but something must be shared.
    pub fn has_common_attributes_and_operations(&self, other: &Class) -> bool {
        let (a1, a2): (Vec<_>, Vec<_>) = (self.all_attributes().collect(), other.all_attributes().collect());
        let (o1, o2): (Vec<_>, Vec<_>) = (self.all_operations().collect(), other.all_operations().collect());
        let shared_attrs = a1.iter().filter(|a| a2.iter().any(|b| a.matches_ignoring_owner(b))).count();
        let shared_ops = o1.iter().filter(|o| o2.iter().any(|p| o.matches_ignoring_owner(p))).count();
        let attrs_ok = shared_attrs > 0 || (a1.is_empty() && a2.is_empty());
        let ops_ok = shared_ops > 0 || (o1.is_empty() && o2.is_empty());
        attrs_ok && ops_ok && shared_attrs + shared_ops > 0
    }

    /// Any attribute or operation name in common.
    pub fn has_attributes_and_operations_with_common_names(&self, other: &Class) -> bool {
        let attr_names: HashSet<&str> = other.all_attributes().map(|a| a.name.as_str()).collect();
        let op_names: HashSet<&str> = other.all_operations().map(|o| o.name.as_str()).collect();
        self.all_attributes().any(|a| attr_names.contains(a.name.as_str()))
            || self.all_operations().any(|o| op_names.contains(o.name.as_str()))
    }

    /// Package with any enclosing class names dropped.
    pub fn top_level_package(&self) -> &str {
        let mut end = 0;
        let mut pos = 0;
        for segment in self.package.split('.') {
            if segment.chars().next().is_some_and(|c| c.is_uppercase()) {
                break;
            }
            pos += segment.len();
            end = pos;
            pos += 1;
        }
        &self.package[..end]
    }

    /// Directory prefix before the package directories, e.g.
    /// `src/main/kotlin` for `src/main/kotlin/a/b/X.kt` in package `a.b`.
    pub fn source_folder(&self) -> String {
        let dir = Path::new(&self.source_file)
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let package_dir = self.top_level_package().replace('.', "/");
        if package_dir.is_empty() {
            return dir;
        }
        match dir.strip_suffix(&package_dir) {
            Some(prefix) => prefix.trim_end_matches('/').to_string(),
            None => dir,
        }
    }

    /// Directory holding the class's file.
    pub fn package_directory(&self) -> String {
        Path::new(&self.source_file)
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }

    pub fn is_inner_class_of(&self, outer: &Class) -> bool {
        !self.is_top_level && self.package == outer.qualified_name()
    }
}

impl MemberContainer for Class {
    fn container_name(&self) -> String {
        self.qualified_name()
    }
    fn file_path(&self) -> &str {
        &self.source_file
    }
    fn location(&self) -> &LocationInfo {
        &self.location
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn attributes(&self) -> Vec<&Attribute> {
        self.all_attributes().collect()
    }
    fn operations(&self) -> Vec<&Operation> {
        self.all_operations().collect()
    }
}

impl MemberContainer for SourceFile {
    fn container_name(&self) -> String {
        self.path.clone()
    }
    fn file_path(&self) -> &str {
        &self.path
    }
    fn location(&self) -> &LocationInfo {
        &self.location
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn attributes(&self) -> Vec<&Attribute> {
        self.attributes.iter().collect()
    }
    fn operations(&self) -> Vec<&Operation> {
        self.operations.iter().collect()
    }
}

impl Generalization {
    pub fn new(child: &str, parent: &str) -> Self {
        Self { child: child.to_string(), parent: parent.to_string() }
    }

    /// Same child and same parent once qualifiers are dropped.
    pub fn matches_ignoring_qualifier(&self, other: &Generalization) -> bool {
        self.child == other.child && last_segment(&self.parent) == last_segment(&other.parent)
    }
}

impl Realization {
    pub fn new(class: &str, interface: &str) -> Self {
        Self { class: class.to_string(), interface: interface.to_string() }
    }

    pub fn matches_ignoring_qualifier(&self, other: &Realization) -> bool {
        self.class == other.class && last_segment(&self.interface) == last_segment(&other.interface)
    }
}

impl StructuralModel {
    pub fn new(classes: Vec<Class>) -> Self {
        Self { classes, ..Default::default() }
    }

    pub fn with_generalization(mut self, child: &str, parent: &str) -> Self {
        self.generalizations.push(Generalization::new(child, parent));
        self
    }

    pub fn with_realization(mut self, class: &str, interface: &str) -> Self {
        self.realizations.push(Realization::new(class, interface));
        self
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn find_class(&self, qualified_name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.qualified_name() == qualified_name)
    }

    /// Every internal inconsistency, one message each; empty when the model
    /// is sound.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let names: HashSet<String> = self.classes.iter().map(|c| c.qualified_name()).collect();

        let mut seen = HashSet::new();
        for c in &self.classes {
            let key = (c.qualified_name(), c.kind, c.source_file.clone());
            if !seen.insert(key) {
                issues.push(format!("duplicate class {} in {}", c.qualified_name(), c.source_file));
            }
            let owner = c.qualified_name();
            for op in c.all_operations() {
                if !op.class_name.is_empty() && op.class_name != owner {
                    issues.push(format!("operation {} claims owner {} but sits in {}", op.name, op.class_name, owner));
                }
            }
            for attr in c.all_attributes() {
                if !attr.class_name.is_empty() && attr.class_name != owner {
                    issues.push(format!("attribute {} claims owner {} but sits in {}", attr.name, attr.class_name, owner));
                }
            }
        }
        for g in &self.generalizations {
            if !names.contains(&g.child) {
                issues.push(format!("generalization {} -> {} references unknown class", g.child, g.parent));
            }
        }
        for r in &self.realizations {
            if !names.contains(&r.class) {
                issues.push(format!("realization {} -> {} references unknown class", r.class, r.interface));
            }
        }
        issues
    }

    /// Rejects an inconsistent model.
    pub fn check(&self) -> Result<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(MinerError::InvalidModel(issues.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo() -> Class {
        Class::new("a", "Foo", "src/a/X.kt")
            .with_attribute(Attribute::new("count", "Int"))
            .with_operation(Operation::new("bar").with_return("Unit"))
    }

    #[test]
    fn builder_assigns_owner() {
        let c = foo();
        assert_eq!(c.qualified_name(), "a.Foo");
        assert_eq!(c.operations[0].class_name, "a.Foo");
        assert_eq!(c.attributes[0].class_name, "a.Foo");
    }

    #[test]
    fn member_conditions() {
        let renamed = Class::new("a", "Bar", "src/a/X.kt")
            .with_attribute(Attribute::new("count", "Int"))
            .with_operation(Operation::new("bar").with_return("Unit"));
        assert!(foo().has_same_attributes_and_operations(&renamed));

        let grown = renamed.clone().with_operation(Operation::new("baz"));
        assert!(!foo().has_same_attributes_and_operations(&grown));
        assert!(foo().has_common_attributes_and_operations(&grown));

        let only_names = Class::new("a", "Qux", "src/a/Q.kt").with_attribute(Attribute::new("count", "Long"));
        assert!(!foo().has_common_attributes_and_operations(&only_names));
        assert!(foo().has_attributes_and_operations_with_common_names(&only_names));
    }

    #[test]
    fn empty_classes_share_nothing() {
        let a = Class::new("a", "A", "A.kt");
        let b = Class::new("b", "B", "B.kt");
        assert!(a.has_same_attributes_and_operations(&b));
        assert!(!a.has_common_attributes_and_operations(&b));
    }

    #[test]
    fn source_folder_strips_package_dirs() {
        let c = Class::new("com.acme", "Foo", "module/src/main/kotlin/com/acme/Foo.kt");
        assert_eq!(c.source_folder(), "module/src/main/kotlin");
        let inner = Class::new("com.acme.Foo", "Inner", "module/src/main/kotlin/com/acme/Foo.kt");
        assert_eq!(inner.top_level_package(), "com.acme");
        assert_eq!(inner.source_folder(), "module/src/main/kotlin");
    }

    #[test]
    fn signature_rendering() {
        let op = Operation::new("load").with_parameter("id", "Int").with_return("User");
        assert_eq!(op.signature(), "public load(id : Int) : User");
    }

    #[test]
    fn validate_reports_dangling_generalization() {
        let model = StructuralModel::new(vec![foo()]).with_generalization("a.Missing", "Base");
        let issues = model.validate();
        assert_eq!(issues.len(), 1);
        assert!(matches!(model.check(), Err(MinerError::InvalidModel(_))));
    }

    #[test]
    fn generalization_qualifier_stripping() {
        let g1 = Generalization::new("a.Foo", "pkg1.Base");
        let g2 = Generalization::new("a.Foo", "pkg2.Base");
        assert_ne!(g1, g2);
        assert!(g1.matches_ignoring_qualifier(&g2));
    }
}
