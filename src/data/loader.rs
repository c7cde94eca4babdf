use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Column, RawTable};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// On-disk table formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Parquet,
}

impl DatasetFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(DatasetFormat::Csv),
            "parquet" | "pq" => Ok(DatasetFormat::Parquet),
            other => bail!("Unsupported file extension: .{other}"),
        }
    }
}

/// Parse raw file bytes into a [`RawTable`].
pub fn parse_table(bytes: &[u8], format: DatasetFormat) -> Result<RawTable> {
    match format {
        DatasetFormat::Csv => parse_csv(bytes),
        DatasetFormat::Parquet => parse_parquet(bytes),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: one header row with column names, then one record per object
/// of interest. Lines starting with `#` (archive export preambles) are skipped.
fn parse_csv(bytes: &[u8]) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        bail!("CSV has no header row");
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(record.iter().map(|v| v.to_string()).collect::<Vec<_>>());
    }

    RawTable::from_records(&headers, &records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Per-column accumulator while walking record batches.
enum ColumnBuilder {
    Numeric(Vec<f64>),
    Text(Vec<Option<String>>),
}

/// Load a Parquet table. Numeric Arrow types become numeric columns, every
/// other type is read as text.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn parse_parquet(bytes: &[u8]) -> Result<RawTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))
        .context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let mut builders: Vec<ColumnBuilder> = schema
        .fields()
        .iter()
        .map(|f| {
            if f.data_type().is_numeric() {
                ColumnBuilder::Numeric(Vec::new())
            } else {
                ColumnBuilder::Text(Vec::new())
            }
        })
        .collect();

    let reader = builder.build().context("building parquet reader")?;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, acc) in builders.iter_mut().enumerate() {
            let col = batch.column(col_idx);
            match acc {
                ColumnBuilder::Numeric(values) => {
                    append_numeric(col, values).with_context(|| {
                        format!("Column '{}': failed to read numbers", names[col_idx])
                    })?
                }
                ColumnBuilder::Text(values) => append_text(col, values).with_context(|| {
                    format!("Column '{}': failed to read text", names[col_idx])
                })?,
            }
        }
    }

    let columns = names
        .into_iter()
        .zip(builders)
        .map(|(name, acc)| match acc {
            ColumnBuilder::Numeric(values) => Column::numeric(name, values),
            ColumnBuilder::Text(values) => Column::text(name, values),
        })
        .collect();

    RawTable::from_columns(columns)
}

// -- Arrow helpers --

fn append_numeric(col: &ArrayRef, out: &mut Vec<f64>) -> Result<()> {
    let casted = cast(col, &DataType::Float64).context("casting to Float64")?;
    let values = casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .context("expected Float64Array")?;
    out.extend(values.iter().map(|v| v.unwrap_or(f64::NAN)));
    Ok(())
}

fn append_text(col: &ArrayRef, out: &mut Vec<Option<String>>) -> Result<()> {
    let casted = cast(col, &DataType::Utf8)
        .with_context(|| format!("casting {:?} to Utf8", col.data_type()))?;
    let values = casted
        .as_any()
        .downcast_ref::<StringArray>()
        .context("expected StringArray")?;
    out.extend(values.iter().map(|v| v.map(|s| s.to_string())));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::model::{CellValue, ColumnData};

    #[test]
    fn csv_skips_comment_preamble_and_infers_types() {
        let csv = "# This file was produced by the NASA Exoplanet Archive\n\
                   # COLUMN koi_period: Orbital Period [days]\n\
                   kepid,koi_disposition,koi_period\n\
                   10797460,CONFIRMED,9.488\n\
                   10811496,CANDIDATE,\n";
        let table = parse_table(csv.as_bytes(), DatasetFormat::Csv).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_cols(), 3);
        assert!(table.column("kepid").unwrap().data.is_numeric());
        assert!(!table.column("koi_disposition").unwrap().data.is_numeric());
        assert_eq!(table.head(2)[1][2], CellValue::Missing);
    }

    #[test]
    fn extension_dispatch() {
        assert_eq!(
            DatasetFormat::from_path(Path::new("koi.CSV")).unwrap(),
            DatasetFormat::Csv
        );
        assert_eq!(
            DatasetFormat::from_path(Path::new("koi.pq")).unwrap(),
            DatasetFormat::Parquet
        );
        assert!(DatasetFormat::from_path(Path::new("koi.xlsx")).is_err());
    }

    #[test]
    fn parquet_columns_keep_order_and_types() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("koi_disposition", DataType::Utf8, true),
            Field::new("koi_fpflag_ss", DataType::Int64, false),
            Field::new("koi_depth", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("CONFIRMED"), None])),
                Arc::new(Int64Array::from(vec![0, 1])),
                Arc::new(Float64Array::from(vec![Some(500.0), None])),
            ],
        )
        .unwrap();

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = parse_table(&buf, DatasetFormat::Parquet).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["koi_disposition", "koi_fpflag_ss", "koi_depth"]
        );
        assert_eq!(
            table.column("koi_fpflag_ss").unwrap().data,
            ColumnData::Numeric(vec![0.0, 1.0])
        );
        assert_eq!(table.head(2)[1][0], CellValue::Missing);
        assert_eq!(table.head(2)[1][2], CellValue::Missing);
    }
}
