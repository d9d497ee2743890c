//! Structured error types for sizegrid.
//!
//! Every fatal condition of a run maps to one variant. Non-fatal findings
//! (unmapped sizes, truncated quantities) are reported as data in
//! [`crate::fill::FillReport`], never as errors.

/// All errors that can occur while reading input, opening a template,
/// filling it, or writing the result.
#[derive(Debug, thiserror::Error)]
pub enum SizegridError {
    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited input could not be read.
    #[error("CSV input: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid cell or column reference.
    #[error("Invalid cell reference: {0}")]
    CellRef(String),

    /// A required package part is absent.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// General parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The template file could not be located.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The requested sheet is not in the workbook.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// No header row containing the marker within the scan bound.
    #[error("Header row with \"{marker}\" not found in the first {scanned} rows")]
    HeaderNotFound { marker: String, scanned: u32 },

    /// A mandatory template column label is missing from the header row.
    #[error("Template column not found: \"{0}\"")]
    ColumnNotFound(String),

    /// Input file lacks required columns.
    #[error("Input is missing required columns: {}", .0.join(", "))]
    MissingInputColumns(Vec<String>),

    /// Input file extension is not one we can read.
    #[error("Unsupported input format: {0}")]
    UnsupportedInput(String),

    /// Not enough rows below the header and row insertion is disallowed.
    #[error(
        "Template has rows up to {available} but {needed} are needed; extend the template and retry"
    )]
    Capacity { needed: u32, available: u32 },

    /// Invalid configuration value.
    #[error("Configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SizegridError>;

impl From<quick_xml::events::attributes::AttrError> for SizegridError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(quick_xml::Error::from(e))
    }
}
