use quick_xml::escape::escape;
use rust_xlsxwriter::{DocProperties, Format, FormatAlign, Workbook};

use crate::compare::ChangeEntry;
use crate::error::Result;

pub const REPORT_FILE_NAME: &str = "Booking_Comparison.xlsx";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const HEADERS: [&str; 5] = ["Dossier", "Field", "Status", "Old Value", "New Value"];

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub sheet_name: String,
    pub column_width: f64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Field-Level Changes".to_string(),
            column_width: 40.0,
        }
    }
}

fn row_cells(entry: &ChangeEntry) -> [&str; 5] {
    [
        entry.dossier.as_str(),
        entry.field.as_str(),
        entry.status.as_str(),
        entry.old_value.as_str(),
        entry.new_value.as_str(),
    ]
}

/// Renders the report as a single-sheet `.xlsx` workbook.
pub fn write_xlsx(entries: &[ChangeEntry], options: &ReportOptions) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    workbook.set_properties(&DocProperties::new().set_title("Booking Comparison"));

    let header_format = Format::new().set_bold();
    let value_format = Format::new().set_text_wrap().set_align(FormatAlign::Top);

    let sheet = workbook.add_worksheet();
    sheet.set_name(&options.sheet_name)?;
    for col in 0..HEADERS.len() as u16 {
        sheet.set_column_width(col, options.column_width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }
    for (i, entry) in entries.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, text) in row_cells(entry).into_iter().enumerate() {
            // Empty values stay blank cells.
            if text.is_empty() {
                continue;
            }
            sheet.write_string_with_format(row, col as u16, text, &value_format)?;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(rows = entries.len(), bytes = bytes.len(), "wrote spreadsheet");
    Ok(bytes)
}

/// The same rows as the spreadsheet, as an HTML table for the preview.
pub fn render_table_html(entries: &[ChangeEntry]) -> String {
    let mut html = String::from(r#"<table class="report"><thead><tr>"#);
    for header in HEADERS {
        html.push_str(&format!("<th>{header}</th>"));
    }
    html.push_str("</tr></thead><tbody>");
    for entry in entries {
        html.push_str(&format!(r#"<tr class="{}">"#, entry.status.as_str().to_lowercase()));
        for cell in row_cells(entry) {
            html.push_str("<td>");
            html.push_str(&escape(cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}
