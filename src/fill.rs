//! One complete run: records in, filled template bytes out.

use serde::Serialize;

use crate::aggregate::aggregate;
use crate::cell_ref::col_to_letter;
use crate::config::TemplateConfig;
use crate::error::{Result, SizegridError};
use crate::export::{save_xlsx, PackageEdits};
use crate::input::InputRecord;
use crate::parser::Workbook;
use crate::populate::{populate, PopulateOptions, UnmappedSize};
use crate::provision::ensure_capacity;
use crate::template::{resolve_anchors, SizeBand};
use crate::trim::trim;

/// What a run did, for the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillReport {
    pub sheet: String,
    pub header_row: u32,
    pub first_row: u32,
    pub items_written: u32,
    pub rows_appended: u32,
    /// Column letters hidden by the trim pass.
    pub hidden_columns: Vec<String>,
    pub unmapped_sizes: Vec<UnmappedSize>,
    pub truncated_quantities: usize,
    /// Names of tables (and `autoFilter` for the sheet filter) widened.
    pub expanded_tables: Vec<String>,
}

/// Filled package plus its report.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub bytes: Vec<u8>,
    pub report: FillReport,
}

/// Fill `template` with `records`.
///
/// Every fatal condition is reported before any bytes are produced; the
/// template itself is never modified.
pub fn fill_template(
    template: &[u8],
    records: &[InputRecord],
    config: &TemplateConfig,
) -> Result<FillOutcome> {
    config.validate()?;
    let band_cols = config.size_band.columns()?;
    let rows = aggregate(records, config.item_order);
    let row_count = u32::try_from(rows.len())
        .map_err(|_| SizegridError::Parse(format!("too many items ({})", rows.len())))?;

    let workbook = Workbook::open(template.to_vec())?;
    let sheet_index = workbook.target_sheet_index(config.sheet.as_deref())?;
    let mut sheet = workbook.load_sheet(sheet_index)?;

    let anchors = resolve_anchors(&sheet, config)?;
    let strategy = config.header_strategy.strategy();
    let band = SizeBand::build(&sheet, anchors.header_row, band_cols, strategy.as_ref());
    if band.keys.is_empty() {
        tracing::warn!(
            "Size band {}:{} has no size labels on row {}",
            config.size_band.start,
            config.size_band.end,
            anchors.header_row
        );
    }

    let first_row = anchors
        .header_row
        .checked_add(config.start_offset)
        .ok_or_else(|| SizegridError::Config("start_offset out of range".into()))?;
    let rows_appended = ensure_capacity(
        &mut sheet,
        anchors.header_row,
        first_row,
        first_row,
        row_count,
        config.capacity,
    )?;

    let mut styles = config.emphasize_values.then(|| workbook.styles().clone());
    let populated = populate(
        &mut sheet,
        &rows,
        &anchors,
        &band,
        PopulateOptions {
            first_row,
            write_zeros: config.write_zeros,
        },
        styles.as_mut(),
    )?;

    let written = populated.row_range(first_row);
    let mut report = FillReport {
        sheet: sheet.name.clone(),
        header_row: anchors.header_row,
        first_row,
        items_written: populated.rows_written,
        rows_appended,
        truncated_quantities: populated.truncated_quantities,
        unmapped_sizes: populated.unmapped,
        ..FillReport::default()
    };

    let mut tables = Vec::new();
    if let Some(written) = written {
        let trimmed = trim(&mut sheet, band_cols, written.clone());
        report.hidden_columns = trimmed.hidden.iter().map(|&c| col_to_letter(c)).collect();

        if config.expand_tables {
            let last_row = *written.end();
            for mut table in workbook.table_parts(sheet_index)? {
                if let Some(xml) = table.expand(anchors.header_row, last_row) {
                    tracing::debug!("Table '{}' now spans {}", table.name, table.range);
                    report.expanded_tables.push(table.name.clone());
                    tables.push((table.path.clone(), xml));
                }
            }
            if let Some(range) = sheet.expand_auto_filter(anchors.header_row, last_row) {
                tracing::debug!("Sheet auto-filter now spans {}", range);
                report.expanded_tables.push("autoFilter".to_string());
            }
        }
    }

    let bytes = save_xlsx(
        workbook.bytes(),
        &PackageEdits {
            sheet: Some(&sheet),
            styles: styles.as_ref(),
            tables,
        },
    )?;

    tracing::info!(
        "Filled '{}': {} items from row {}, {} rows appended, {} columns hidden, {} unmapped sizes",
        report.sheet,
        report.items_written,
        report.first_row,
        report.rows_appended,
        report.hidden_columns.len(),
        report.unmapped_sizes.len()
    );
    Ok(FillOutcome { bytes, report })
}
