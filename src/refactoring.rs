//! refactoring.rs
//! The records handed back to callers: what kind of refactoring, a
//! human-readable description and the code ranges on both sides.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::location::CodeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefactoringKind {
    MoveClass,
    RenameClass,
    MoveAndRenameClass,
    RenamePackage,
    MoveSourceFolder,
    ExtractSuperclass,
    ExtractInterface,
    AddClassAnnotation,
    RemoveClassAnnotation,
    RenameMethod,
    ExtractOperation,
    InlineOperation,
    MoveOperation,
    PullUpOperation,
    PushDownOperation,
    ChangeReturnType,
    AddParameter,
    RemoveParameter,
    RenameParameter,
    ChangeParameterType,
    ReorderParameter,
    AddMethodAnnotation,
    RemoveMethodAnnotation,
    ModifyMethodAnnotation,
    RenameAttribute,
    ChangeAttributeType,
    RenameVariable,
    ChangeVariableType,
    ExtractVariable,
    InlineVariable,
    SplitVariable,
    SplitParameter,
    MergeVariable,
}

impl RefactoringKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            RefactoringKind::MoveClass => "Move Class",
            RefactoringKind::RenameClass => "Rename Class",
            RefactoringKind::MoveAndRenameClass => "Move And Rename Class",
            RefactoringKind::RenamePackage => "Rename Package",
            RefactoringKind::MoveSourceFolder => "Move Source Folder",
            RefactoringKind::ExtractSuperclass => "Extract Superclass",
            RefactoringKind::ExtractInterface => "Extract Interface",
            RefactoringKind::AddClassAnnotation => "Add Class Annotation",
            RefactoringKind::RemoveClassAnnotation => "Remove Class Annotation",
            RefactoringKind::RenameMethod => "Rename Method",
            RefactoringKind::ExtractOperation => "Extract Method",
            RefactoringKind::InlineOperation => "Inline Method",
            RefactoringKind::MoveOperation => "Move Method",
            RefactoringKind::PullUpOperation => "Pull Up Method",
            RefactoringKind::PushDownOperation => "Push Down Method",
            RefactoringKind::ChangeReturnType => "Change Return Type",
            RefactoringKind::AddParameter => "Add Parameter",
            RefactoringKind::RemoveParameter => "Remove Parameter",
            RefactoringKind::RenameParameter => "Rename Parameter",
            RefactoringKind::ChangeParameterType => "Change Parameter Type",
            RefactoringKind::ReorderParameter => "Reorder Parameter",
            RefactoringKind::AddMethodAnnotation => "Add Method Annotation",
            RefactoringKind::RemoveMethodAnnotation => "Remove Method Annotation",
            RefactoringKind::ModifyMethodAnnotation => "Modify Method Annotation",
            RefactoringKind::RenameAttribute => "Rename Attribute",
            RefactoringKind::ChangeAttributeType => "Change Attribute Type",
            RefactoringKind::RenameVariable => "Rename Variable",
            RefactoringKind::ChangeVariableType => "Change Variable Type",
            RefactoringKind::ExtractVariable => "Extract Variable",
            RefactoringKind::InlineVariable => "Inline Variable",
            RefactoringKind::SplitVariable => "Split Variable",
            RefactoringKind::SplitParameter => "Split Parameter",
            RefactoringKind::MergeVariable => "Merge Variable",
        }
    }

    pub fn is_class_level(&self) -> bool {
        matches!(
            self,
            RefactoringKind::MoveClass
                | RefactoringKind::RenameClass
                | RefactoringKind::MoveAndRenameClass
                | RefactoringKind::RenamePackage
                | RefactoringKind::MoveSourceFolder
                | RefactoringKind::ExtractSuperclass
                | RefactoringKind::ExtractInterface
        )
    }
}

impl fmt::Display for RefactoringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for RefactoringKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

/// A (file path, qualified class name) pair touched by a refactoring.
pub type ClassRef = (String, String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refactoring {
    #[serde(rename = "type")]
    pub kind: RefactoringKind,
    pub description: String,
    #[serde(rename = "leftSideLocations")]
    pub left_side: Vec<CodeRange>,
    #[serde(rename = "rightSideLocations")]
    pub right_side: Vec<CodeRange>,
    #[serde(skip)]
    pub classes_before: Vec<ClassRef>,
    #[serde(skip)]
    pub classes_after: Vec<ClassRef>,
}

impl Refactoring {
    /// `detail` is the part after the kind, e.g. `a.Foo renamed to a.Bar`.
    pub fn new(kind: RefactoringKind, detail: impl fmt::Display) -> Self {
        Self {
            kind,
            description: format!("{}\t{}", kind.display_name(), detail),
            left_side: Vec::new(),
            right_side: Vec::new(),
            classes_before: Vec::new(),
            classes_after: Vec::new(),
        }
    }

    pub fn left(mut self, range: CodeRange) -> Self {
        self.left_side.push(range);
        self
    }

    pub fn right(mut self, range: CodeRange) -> Self {
        self.right_side.push(range);
        self
    }

    pub fn class_before(mut self, file: &str, class: &str) -> Self {
        let entry = (file.to_string(), class.to_string());
        if !self.classes_before.contains(&entry) {
            self.classes_before.push(entry);
        }
        self
    }

    pub fn class_after(mut self, file: &str, class: &str) -> Self {
        let entry = (file.to_string(), class.to_string());
        if !self.classes_after.contains(&entry) {
            self.classes_after.push(entry);
        }
        self
    }
}

impl fmt::Display for Refactoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationInfo;

    #[test]
    fn serializes_as_report_json() {
        let loc = LocationInfo::new("a/X.kt", 1, 10);
        let r = Refactoring::new(RefactoringKind::RenameClass, "a.Foo renamed to a.Bar")
            .left(loc.code_range("original type declaration", "a.Foo"))
            .right(loc.code_range("renamed type declaration", "a.Bar"))
            .class_before("a/X.kt", "a.Foo")
            .class_after("a/X.kt", "a.Bar");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "Rename Class");
        assert_eq!(json["description"], "Rename Class\ta.Foo renamed to a.Bar");
        assert_eq!(json["leftSideLocations"][0]["filePath"], "a/X.kt");
        assert_eq!(json["rightSideLocations"].as_array().unwrap().len(), 1);
        assert!(json.get("classes_before").is_none());
    }
}
