//! Run configuration.
//!
//! Everything that differs between template revisions (header labels, the
//! size-band letters, the constant identifiers written on every row) lives in
//! [`TemplateConfig`] so a new revision is a new TOML file, not a code change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cell_ref::letter_to_col;
use crate::error::{Result, SizegridError};

/// File name looked up next to the executable when no config is given.
pub const CONFIG_FILE_NAME: &str = "sizegrid.toml";

/// Default configuration embedded in the binary
pub const DEFAULT_CONFIG: &str = r#"
template_path = "template.xlsx"
header_marker = "Material Number"
max_scan_rows = 50
item_column = "Material Number"
header_strategy = "single_row"
capacity = "extend"
item_order = "sorted"
write_zeros = false
start_offset = 1
emphasize_values = true
expand_tables = true

[[fixed_columns]]
label = "Sold To"
value = 0

[[fixed_columns]]
label = "Ship To"
value = 0

[size_band]
start = "AM"
end = "DR"
"#;

/// Template layout and fill options for one template revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Template file; relative paths are also tried next to the executable.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
    /// Target sheet name. Defaults to the workbook's active sheet.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Exact label that identifies the header row.
    pub header_marker: String,
    /// How many rows from the top are scanned for the marker.
    #[serde(default = "default_max_scan_rows")]
    pub max_scan_rows: u32,
    /// Header label of the item-identifier column.
    pub item_column: String,
    /// Columns that receive the same constant on every written row.
    #[serde(default)]
    pub fixed_columns: Vec<FixedColumn>,
    pub size_band: SizeBandConfig,
    #[serde(default)]
    pub header_strategy: HeaderStrategyKind,
    #[serde(default)]
    pub capacity: CapacityPolicy,
    #[serde(default)]
    pub item_order: ItemOrder,
    /// Write literal zeros instead of leaving zero-quantity cells empty.
    #[serde(default)]
    pub write_zeros: bool,
    /// First data row = header row + `start_offset`.
    #[serde(default = "default_start_offset")]
    pub start_offset: u32,
    /// Render written cells in bold, keeping the rest of their format.
    #[serde(default)]
    pub emphasize_values: bool,
    /// Widen structured tables and the auto-filter to cover written rows.
    #[serde(default = "default_true")]
    pub expand_tables: bool,
}

fn default_max_scan_rows() -> u32 {
    50
}

fn default_start_offset() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// A header label and the constant written under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedColumn {
    pub label: String,
    pub value: FixedValue,
}

/// Constant cell value for a fixed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixedValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

/// Column-letter bounds of the size band, inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBandConfig {
    pub start: String,
    pub end: String,
}

impl SizeBandConfig {
    /// Resolve the letters into 1-based `(start, end)` column indices.
    pub fn columns(&self) -> Result<(u32, u32)> {
        let start = letter_to_col(&self.start)?;
        let end = letter_to_col(&self.end)?;
        if start > end {
            return Err(SizegridError::Config(format!(
                "size band start {} is after end {}",
                self.start, self.end
            )));
        }
        Ok((start, end))
    }
}

/// How a size-band column's label is read from the header area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStrategyKind {
    /// The header row cell only.
    #[default]
    SingleRow,
    /// The header row and the row above it, preferring size-looking labels.
    StackedRows,
}

/// What to do when the template has fewer rows than items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Append rows styled like the first data row.
    #[default]
    Extend,
    /// Refuse and ask for a pre-extended template.
    Strict,
}

/// Order of items in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrder {
    /// Ascending by item id.
    #[default]
    Sorted,
    /// Order of first appearance in the input.
    File,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            template_path: Some(PathBuf::from("template.xlsx")),
            sheet: None,
            header_marker: "Material Number".to_string(),
            max_scan_rows: default_max_scan_rows(),
            item_column: "Material Number".to_string(),
            fixed_columns: vec![
                FixedColumn {
                    label: "Sold To".to_string(),
                    value: FixedValue::Integer(0),
                },
                FixedColumn {
                    label: "Ship To".to_string(),
                    value: FixedValue::Integer(0),
                },
            ],
            size_band: SizeBandConfig {
                start: "AM".to_string(),
                end: "DR".to_string(),
            },
            header_strategy: HeaderStrategyKind::SingleRow,
            capacity: CapacityPolicy::Extend,
            item_order: ItemOrder::Sorted,
            write_zeros: false,
            start_offset: default_start_offset(),
            emphasize_values: true,
            expand_tables: true,
        }
    }
}

impl TemplateConfig {
    /// Parse a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: TemplateConfig =
            toml::from_str(contents).map_err(|e| SizegridError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the fill pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.header_marker.trim().is_empty() {
            return Err(SizegridError::Config("header_marker is empty".into()));
        }
        if self.item_column.trim().is_empty() {
            return Err(SizegridError::Config("item_column is empty".into()));
        }
        if self.max_scan_rows == 0 {
            return Err(SizegridError::Config("max_scan_rows must be at least 1".into()));
        }
        if self.start_offset == 0 {
            return Err(SizegridError::Config(
                "start_offset must be at least 1 (first data row is below the header)".into(),
            ));
        }
        self.size_band.columns()?;
        Ok(())
    }

    /// Locate the template file.
    ///
    /// `override_path` (from the command line) wins over the configured path.
    /// A relative path missing from the working directory is retried next to
    /// the executable.
    pub fn resolve_template_path(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        let candidate = override_path
            .map(Path::to_path_buf)
            .or_else(|| self.template_path.clone())
            .ok_or_else(|| SizegridError::Config("no template path configured".into()))?;

        if candidate.exists() {
            return Ok(candidate);
        }

        if candidate.is_relative() {
            if let Some(beside_exe) = exe_dir().map(|dir| dir.join(&candidate)) {
                if beside_exe.exists() {
                    tracing::debug!("Using template next to executable: {}", beside_exe.display());
                    return Ok(beside_exe);
                }
            }
        }

        Err(SizegridError::TemplateNotFound(candidate.display().to_string()))
    }
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Load configuration.
///
/// Search order:
/// 1. `explicit` path, if given (errors if unreadable)
/// 2. `sizegrid.toml` next to the executable
/// 3. the embedded default
pub fn load_config(explicit: Option<&Path>) -> Result<TemplateConfig> {
    if let Some(path) = explicit {
        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        return TemplateConfig::from_toml(&contents);
    }

    if let Some(config_path) = exe_dir().map(|dir| dir.join(CONFIG_FILE_NAME)) {
        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            return TemplateConfig::from_toml(&contents);
        }
        tracing::debug!("{} not found at: {}", CONFIG_FILE_NAME, config_path.display());
    }

    tracing::info!("Using default embedded configuration");
    TemplateConfig::from_toml(DEFAULT_CONFIG)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = TemplateConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, TemplateConfig::default());
        assert_eq!(config.size_band.columns().unwrap(), (39, 122));
        assert_eq!(config.fixed_columns.len(), 2);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = TemplateConfig::from_toml(
            r#"
header_marker = "SKU"
item_column = "SKU"

[size_band]
start = "F"
end = "H"
"#,
        )
        .unwrap();
        assert_eq!(config.max_scan_rows, 50);
        assert_eq!(config.start_offset, 1);
        assert!(config.fixed_columns.is_empty());
        assert!(!config.write_zeros);
        assert_eq!(config.capacity, CapacityPolicy::Extend);
        assert!(config.expand_tables);
    }

    #[test]
    fn test_fixed_values_untagged() {
        let config = TemplateConfig::from_toml(
            r#"
header_marker = "SKU"
item_column = "SKU"
fixed_columns = [
  { label = "Sold To", value = 1200 },
  { label = "Region", value = "EU" },
]

[size_band]
start = "F"
end = "H"
"#,
        )
        .unwrap();
        assert_eq!(config.fixed_columns[0].value, FixedValue::Integer(1200));
        assert_eq!(config.fixed_columns[1].value, FixedValue::Text("EU".into()));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = TemplateConfig {
            start_offset: 0,
            ..TemplateConfig::default()
        };
        assert!(matches!(config.validate(), Err(SizegridError::Config(_))));

        config.start_offset = 1;
        config.size_band = SizeBandConfig {
            start: "H".into(),
            end: "F".into(),
        };
        assert!(config.validate().is_err());

        assert!(TemplateConfig::from_toml("header_marker = 3").is_err());
    }

    #[test]
    fn test_missing_template_reported() {
        let config = TemplateConfig {
            template_path: Some(PathBuf::from("definitely/not/here.xlsx")),
            ..TemplateConfig::default()
        };
        let err = config.resolve_template_path(None).unwrap_err();
        assert!(matches!(err, SizegridError::TemplateNotFound(_)));
    }
}
