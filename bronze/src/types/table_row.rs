use crate::conversions::Cell;

/// A row as read from the source, one [`Cell`] per column.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub values: Vec<Cell>,
}

impl TableRow {
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }
}

/// The full content of a source table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    /// Column names in `SELECT *` order.
    pub column_names: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl TableData {
    pub fn new(column_names: Vec<String>, rows: Vec<TableRow>) -> Self {
        Self { column_names, rows }
    }
}
