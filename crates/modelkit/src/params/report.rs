//! Registry reports - presentation-only views of a parameter registry
//!
//! Tabular, JSON, and HTML renderings for admin/debug surfaces. No business
//! logic lives here.

use serde::Serialize;
use serde_json::Value;

use crate::error::ModelResult;
use crate::params::registry::ParamRegistry;

/// One row of a registry report
#[derive(Debug, Serialize)]
pub struct ReportRow<'a> {
    pub section: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub default: Value,
}

/// Rows of the registry, optionally filtered to one section.
pub fn report_rows<'a>(registry: &'a ParamRegistry, section: Option<&str>) -> Vec<ReportRow<'a>> {
    registry
        .iter()
        .filter(|spec| section.map_or(true, |s| spec.section == s))
        .map(|spec| ReportRow {
            section: &spec.section,
            name: &spec.name,
            description: &spec.description,
            default: spec.default.to_json(),
        })
        .collect()
}

/// JSON array of report rows (`[]` for an empty or fully filtered registry).
pub fn report_json(registry: &ParamRegistry, section: Option<&str>) -> ModelResult<String> {
    let rows = report_rows(registry, section);
    Ok(serde_json::to_string(&rows)?)
}

/// HTML table of the registry for markup-capable surfaces.
pub fn report_html(registry: &ParamRegistry, section: Option<&str>) -> String {
    let rows = report_rows(registry, section);
    if rows.is_empty() {
        return "[]".to_string();
    }

    let mut html = String::from(
        "<table width=90%><tr><th>Section</th><th>Name</th><th>Default</th><th>Description</th></tr>",
    );
    for row in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            row.section, row.name, row.default, row.description
        ));
    }
    html.push_str("</table>");
    html
}

/// Plain-text table with aligned columns.
pub fn report_text(registry: &ParamRegistry, section: Option<&str>) -> String {
    let rows = report_rows(registry, section);
    if rows.is_empty() {
        return "[]".to_string();
    }

    let rendered: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.section.to_string(),
                row.name.to_string(),
                row.default.to_string(),
                row.description.to_string(),
            ]
        })
        .collect();

    let headers = ["section", "name", "default", "description"];
    let mut widths = [0usize; 4];
    for (i, header) in headers.iter().enumerate() {
        widths[i] = header.len();
    }
    for row in &rendered {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    for (i, header) in headers.iter().enumerate() {
        out.push_str(&format!("{:<width$}  ", header, width = widths[i]));
    }
    out.push('\n');
    for row in rendered {
        for (i, cell) in row.iter().enumerate() {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
        }
        out.push('\n');
    }
    out
}
