use crate::formats::{FormatError, Result};
use calamine::{open_workbook_auto, DataType, Reader};
use std::path::Path;

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Read the first worksheet of an ES&S export (xlsx, xls or ods) as rows of
/// cell text.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let spreadsheet = |source| FormatError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet)?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| FormatError::DataValidation(format!("{}: no worksheets", path.display())))?;
    let sheet = workbook
        .worksheet_range(&first_sheet)
        .ok_or_else(|| {
            FormatError::DataValidation(format!("{}: cannot read {}", path.display(), first_sheet))
        })?
        .map_err(spreadsheet)?;

    Ok(sheet
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}
