//! Sheets Module
//!
//! The spreadsheet-like store the identity subsystem reads from and
//! writes back to: JSON workbooks made of named tabs of raw cells.

pub mod source;
pub mod store;
pub mod writer;

pub use source::{TabularSource, WorkbookSource};
pub use store::{WorkbookCatalog, WorkbookStore};
pub use writer::{CellWrite, DeltaWriter, WorkbookWriter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw row of a tab, header rows included.
pub type Row = Vec<Value>;

/// Render a raw cell the way a spreadsheet displays it.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Text of column `col` (0-based) of `row`, empty when the row is short.
pub fn row_text(row: &[Value], col: usize) -> String {
    row.get(col).map(cell_text).unwrap_or_default()
}

/// A named tab of a workbook
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Tab {
    pub name: String,
    /// Frozen header rows, as configured in the sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_rows: Option<usize>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Tab {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            frozen_rows: None,
            rows,
        }
    }

    /// Number of leading header rows: frozen rows when set, otherwise one.
    pub fn header_rows(&self) -> usize {
        self.frozen_rows.filter(|n| *n > 0).unwrap_or(1)
    }

    pub fn cell(&self, row: usize, col: usize) -> String {
        self.rows.get(row).map(|r| row_text(r, col)).unwrap_or_default()
    }

    /// Overwrite one cell, growing the grid as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<Value>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, Value::String(String::new()));
        }
        cells[col] = value.into();
    }
}

/// A whole spreadsheet: its own URL plus ordered tabs
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Workbook {
    pub url: String,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

impl Workbook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tabs: Vec::new(),
        }
    }

    pub fn with_tab(mut self, tab: Tab) -> Self {
        self.tabs.push(tab);
        self
    }

    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.name == name)
    }

    pub fn tab_mut(&mut self, name: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.name == name)
    }

    /// Insert a tab in first position.
    pub fn insert_front(&mut self, tab: Tab) {
        self.tabs.insert(0, tab);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_text_renders_numbers_like_a_sheet() {
        assert_eq!(cell_text(&json!(17)), "17");
        assert_eq!(cell_text(&json!(5.0)), "5");
        assert_eq!(cell_text(&json!(2.5)), "2.5");
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!("P-00012")), "P-00012");
    }

    #[test]
    fn test_header_rows_defaults_to_one() {
        let mut tab = Tab::new("Directory", vec![]);
        assert_eq!(tab.header_rows(), 1);
        tab.frozen_rows = Some(0);
        assert_eq!(tab.header_rows(), 1);
        tab.frozen_rows = Some(2);
        assert_eq!(tab.header_rows(), 2);
    }

    #[test]
    fn test_set_cell_grows_grid() {
        let mut tab = Tab::new("Directory", vec![vec![json!("Person ID")]]);
        tab.set_cell(3, 2, "Smith");
        assert_eq!(tab.rows.len(), 4);
        assert_eq!(tab.cell(3, 2), "Smith");
        assert_eq!(tab.cell(3, 0), "");
        assert_eq!(tab.cell(9, 9), "");
    }
}
