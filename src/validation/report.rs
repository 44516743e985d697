//! Validation report types for structured error reporting.

use serde::Serialize;
use std::fmt;

/// The result of checking one or more splits.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// All issues found during validation.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Appends every issue of another report.
    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    pub message: String,

    /// Where the issue occurred.
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// The split converts, but something looks off.
    Warning,
    /// Conversion of the split would fail.
    Error,
}

/// A stable code identifying the type of validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    // Layout
    /// The split's image directory or annotation file is not under the root.
    SplitNotFound,

    // Images
    DuplicateImageId,
    DuplicateFileName,
    InvalidImageDimensions,
    InvalidVideoTag,
    /// An image file on disk has no entry in the annotation file.
    ImageNotInAnnotations,
    /// An `images` entry has no file on disk; it will not be uploaded.
    ImageFileMissing,

    // References
    MissingImageRef,
    UnknownCategory,
    /// The file's own category name differs from the class table.
    CategoryNameMismatch,

    // Geometry
    MalformedContour,
    RleSegmentation,
    BBoxNotFinite,
    InvalidBBoxArea,
    InvertedBBox,
    BBoxOutOfBounds,
}

/// Where a validation issue occurred.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Split { name: String },
    Image { id: u64 },
    ImageFile { name: String },
    Annotation { id: String },
    Category { id: u64 },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Split { name } => write!(f, "split '{}'", name),
            IssueContext::Image { id } => write!(f, "image {}", id),
            IssueContext::ImageFile { name } => write!(f, "file '{}'", name),
            IssueContext::Annotation { id } => write!(f, "annotation {}", id),
            IssueContext::Category { id } => write!(f, "category {}", id),
        }
    }
}
