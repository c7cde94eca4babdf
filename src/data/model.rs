use std::fmt;

use anyhow::{Result, bail};

/// Cell tokens read as missing, mirroring the usual dataframe NA set.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// CellValue – a single cell, used for previews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{v:.0}"),
            CellValue::Number(v) => write!(f, "{v:.4}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Missing => write!(f, "<NA>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Column – typed storage for one named column
// ---------------------------------------------------------------------------

/// Column storage. Numeric columns keep missing cells as NaN.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    pub fn cell(&self, row: usize) -> CellValue {
        match self {
            ColumnData::Numeric(v) => match v.get(row) {
                Some(x) if !x.is_nan() => CellValue::Number(*x),
                _ => CellValue::Missing,
            },
            ColumnData::Text(v) => match v.get(row) {
                Some(Some(s)) => CellValue::Text(s.clone()),
                _ => CellValue::Missing,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    /// Build a column from raw string cells, inferring its storage type.
    ///
    /// The column is numeric when every non-missing cell parses as a number;
    /// an entirely missing column is numeric (all NaN).
    pub fn infer(name: impl Into<String>, cells: Vec<String>) -> Self {
        let parsed: Option<Vec<f64>> = cells
            .iter()
            .map(|cell| {
                let cell = cell.trim();
                if is_missing_token(cell) {
                    Some(f64::NAN)
                } else {
                    cell.parse::<f64>().ok()
                }
            })
            .collect();

        match parsed {
            Some(values) => Column::numeric(name, values),
            None => Column::text(
                name,
                cells
                    .into_iter()
                    .map(|cell| (!is_missing_token(cell.trim())).then_some(cell))
                    .collect(),
            ),
        }
    }
}

pub fn is_missing_token(cell: &str) -> bool {
    NA_TOKENS.contains(&cell)
}

// ---------------------------------------------------------------------------
// RawTable – the loaded dataset
// ---------------------------------------------------------------------------

/// Column-oriented in-memory table. Column order and row order follow the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl RawTable {
    /// Assemble a table from typed columns; all columns must share one length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        for col in &columns {
            if col.data.len() != n_rows {
                bail!(
                    "Column '{}' has {} rows but expected {n_rows}",
                    col.name,
                    col.data.len()
                );
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// Build a table from a header row and string records, inferring column types.
    pub fn from_records(headers: &[String], records: &[Vec<String>]) -> Result<Self> {
        let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(records.len()); headers.len()];
        for (row_no, record) in records.iter().enumerate() {
            if record.len() != headers.len() {
                bail!(
                    "Row {row_no}: expected {} fields but found {}",
                    headers.len(),
                    record.len()
                );
            }
            for (col_idx, value) in record.iter().enumerate() {
                cells[col_idx].push(value.clone());
            }
        }
        let columns = headers
            .iter()
            .zip(cells)
            .map(|(name, col_cells)| Column::infer(name.clone(), col_cells))
            .collect();
        Self::from_columns(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[cfg(test)]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[cfg(test)]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// First `n` rows as display cells, for previews.
    pub fn head(&self, n: usize) -> Vec<Vec<CellValue>> {
        (0..self.n_rows.min(n))
            .map(|row| self.columns.iter().map(|c| c.data.cell(row)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn infers_numeric_with_missing_cells() {
        let col = Column::infer("koi_depth", strings(&["500", "", "NaN", "3.5e2"]));
        let ColumnData::Numeric(values) = col.data else {
            panic!("expected numeric column");
        };
        assert_eq!(values[0], 500.0);
        assert!(values[1].is_nan());
        assert!(values[2].is_nan());
        assert_eq!(values[3], 350.0);
    }

    #[test]
    fn any_unparsable_cell_makes_column_text() {
        let col = Column::infer("kepoi_name", strings(&["1.0", "K00752.01", ""]));
        assert_eq!(
            col.data,
            ColumnData::Text(vec![Some("1.0".into()), Some("K00752.01".into()), None])
        );
    }

    #[test]
    fn all_missing_column_is_numeric() {
        let col = Column::infer("koi_teq_err1", strings(&["", ""]));
        assert!(col.data.is_numeric());
    }

    #[test]
    fn from_records_rejects_ragged_rows() {
        let headers = strings(&["a", "b"]);
        let records = vec![strings(&["1", "2"]), strings(&["3"])];
        assert!(RawTable::from_records(&headers, &records).is_err());
    }

    #[test]
    fn head_preserves_row_and_column_order() {
        let headers = strings(&["name", "value"]);
        let records = vec![
            strings(&["x", "1"]),
            strings(&["y", ""]),
            strings(&["z", "2.5"]),
        ];
        let table = RawTable::from_records(&headers, &records).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column_names(), headers);
        let head = table.head(2);
        assert_eq!(head.len(), 2);
        assert_eq!(head[0][0], CellValue::Text("x".into()));
        assert_eq!(head[1][1], CellValue::Missing);
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5000");
    }
}
