//! location.rs
//! Source spans attached to model entities and to reported refactorings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeElementType {
    TypeDeclaration,
    MethodDeclaration,
    FieldDeclaration,
    SingleVariableDeclaration,
    VariableDeclarationStatement,
    ExpressionStatement,
    ReturnStatement,
    IfStatement,
    ForStatement,
    WhileStatement,
    WhenExpression,
    TryStatement,
    Block,
    MethodInvocation,
    ClassInstanceCreation,
    Annotation,
    PackageDeclaration,
    #[default]
    Other,
}

/// Where an entity lives in its revision's source tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LocationInfo {
    pub file_path: String,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub start_column: u32,
    #[serde(default)]
    pub end_column: u32,
    #[serde(default)]
    pub element_type: CodeElementType,
}

impl LocationInfo {
    pub fn new(file_path: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self { file_path: file_path.into(), start_line, end_line, ..Default::default() }
    }

    pub fn with_columns(mut self, start_column: u32, end_column: u32) -> Self {
        self.start_column = start_column;
        self.end_column = end_column;
        self
    }

    pub fn with_element_type(mut self, element_type: CodeElementType) -> Self {
        self.element_type = element_type;
        self
    }

    /// Range for reporting, with a short role (`"original class declaration"`)
    /// and the rendered element it highlights.
    pub fn code_range(&self, description: &str, code_element: impl Into<String>) -> CodeRange {
        CodeRange {
            file_path: self.file_path.clone(),
            start_line: self.start_line,
            end_line: self.end_line,
            start_column: self.start_column,
            end_column: self.end_column,
            code_element_type: self.element_type,
            description: Some(description.to_string()),
            code_element: Some(code_element.into()),
        }
    }
}

/// A highlighted span in one side of a refactoring report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRange {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_column: u32,
    pub end_column: u32,
    pub code_element_type: CodeElementType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_element: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_range_serializes_camel_case() {
        let range = LocationInfo::new("src/a/X.kt", 3, 9)
            .with_columns(1, 2)
            .with_element_type(CodeElementType::TypeDeclaration)
            .code_range("original type declaration", "a.Foo");
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(json["filePath"], "src/a/X.kt");
        assert_eq!(json["startLine"], 3);
        assert_eq!(json["codeElementType"], "TYPE_DECLARATION");
        assert_eq!(json["codeElement"], "a.Foo");
    }
}
