//! Writes a synthetic Kepler cumulative KOI table as CSV and Parquet.
//!
//! Usage: `generate_sample [OUTPUT_DIR] [ROWS]`

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CSV_NAME: &str = "cumulative_2025.09.20_06.45.53.csv";
const PARQUET_NAME: &str = "cumulative_sample.parquet";

/// Numeric measurement columns; each gets `_err1` / `_err2` margins.
const MEASURED: &[&str] = &[
    "koi_period",
    "koi_impact",
    "koi_duration",
    "koi_depth",
    "koi_prad",
    "koi_teq",
    "koi_insol",
    "koi_steff",
    "koi_slogg",
    "koi_srad",
];

#[derive(Clone, Copy)]
enum Disposition {
    Confirmed,
    Candidate,
    FalsePositive,
}

impl Disposition {
    fn label(self) -> &'static str {
        match self {
            Disposition::Confirmed => "CONFIRMED",
            Disposition::Candidate => "CANDIDATE",
            Disposition::FalsePositive => "FALSE POSITIVE",
        }
    }
}

struct KoiRow {
    rowid: i64,
    kepid: i64,
    kepoi_name: String,
    kepler_name: Option<String>,
    disposition: Disposition,
    score: Option<f64>,
    fpflags: [f64; 4],
    model_snr: f64,
    /// Same order as `MEASURED`; `None` is a blank cell.
    measured: Vec<Option<f64>>,
    delivname: &'static str,
}

fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-15);
    let u2: f64 = rng.random();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn generate_row(i: usize, rng: &mut StdRng) -> KoiRow {
    let disposition = match rng.random_range(0..10) {
        0..=3 => Disposition::Confirmed,
        4..=6 => Disposition::Candidate,
        _ => Disposition::FalsePositive,
    };

    let (period, prad, snr, impact): (f64, f64, f64, f64) = match disposition {
        Disposition::Confirmed => (
            10f64.powf(rng.random_range(0.0..2.3)),
            gauss(rng, 2.2, 0.8).abs() + 0.5,
            gauss(rng, 60.0, 25.0).abs() + 10.0,
            rng.random_range(0.0..0.7),
        ),
        Disposition::Candidate => (
            10f64.powf(rng.random_range(0.0..2.8)),
            gauss(rng, 3.5, 2.5).abs() + 0.5,
            gauss(rng, 15.0, 6.0).abs() + 7.0,
            rng.random_range(0.0..1.1),
        ),
        Disposition::FalsePositive => (
            10f64.powf(rng.random_range(-0.3..2.5)),
            gauss(rng, 20.0, 15.0).abs() + 1.0,
            gauss(rng, 90.0, 80.0).abs() + 7.0,
            rng.random_range(0.2..1.5),
        ),
    };

    let fpflags = match disposition {
        Disposition::FalsePositive => {
            let mut flags = [0.0; 4];
            flags[rng.random_range(0..4)] = 1.0;
            if rng.random_bool(0.3) {
                flags[rng.random_range(0..4)] = 1.0;
            }
            flags
        }
        _ if rng.random_bool(0.03) => [0.0, 0.0, 1.0, 0.0],
        _ => [0.0; 4],
    };

    let srad = gauss(rng, 1.0, 0.3).abs() + 0.2;
    let depth = (prad / (srad * 109.2)).powi(2) * 1e6;
    let chord = (1.0 - impact * impact).abs().sqrt();
    let duration = 13.0 * (period / 365.0).powf(1.0 / 3.0) * srad * chord + 0.5;
    let teq = 278.0 * (365.0 / period).powf(1.0 / 3.0) * srad.sqrt();
    let insol = (teq / 278.0).powi(4);

    let measured = [
        period,
        impact,
        duration,
        depth,
        prad,
        teq,
        insol,
        gauss(rng, 5700.0, 600.0),
        gauss(rng, 4.4, 0.2),
        srad,
    ]
    .into_iter()
    .map(|v| if rng.random_bool(0.04) { None } else { Some(v) })
    .collect();

    let kepid = 10_000_000 + (i as i64) * 37;
    let kepler_name = matches!(disposition, Disposition::Confirmed)
        .then(|| format!("Kepler-{} b", 100 + i));
    let score = match disposition {
        Disposition::Confirmed => Some(rng.random_range(0.8..1.0)),
        Disposition::Candidate => Some(rng.random_range(0.3..1.0)),
        Disposition::FalsePositive => (!rng.random_bool(0.2)).then(|| rng.random_range(0.0..0.3)),
    };

    KoiRow {
        rowid: i as i64 + 1,
        kepid,
        kepoi_name: format!("K{:05}.01", i + 1),
        kepler_name,
        disposition,
        score,
        fpflags,
        model_snr: snr,
        measured,
        delivname: if i % 3 == 0 { "q1_q16_tce" } else { "q1_q17_dr25_tce" },
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.5}")).unwrap_or_default()
}

fn header() -> Vec<String> {
    let mut cols: Vec<String> = [
        "rowid",
        "kepid",
        "kepoi_name",
        "kepler_name",
        "koi_disposition",
        "koi_pdisposition",
        "koi_score",
        "koi_fpflag_nt",
        "koi_fpflag_ss",
        "koi_fpflag_co",
        "koi_fpflag_ec",
        "koi_model_snr",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for name in MEASURED {
        cols.push(name.to_string());
        cols.push(format!("{name}_err1"));
        cols.push(format!("{name}_err2"));
    }
    cols.push("koi_tce_delivname".to_string());
    cols
}

fn pdisposition(d: Disposition) -> &'static str {
    match d {
        Disposition::FalsePositive => "FALSE POSITIVE",
        _ => "CANDIDATE",
    }
}

fn write_csv(path: &Path, rows: &[KoiRow]) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "# This file was produced by generate_sample")?;
    writeln!(file, "# Synthetic Kepler Objects of Interest, cumulative table layout")?;
    writeln!(file, "#")?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(header())?;
    for r in rows {
        let mut record = vec![
            r.rowid.to_string(),
            r.kepid.to_string(),
            r.kepoi_name.clone(),
            r.kepler_name.clone().unwrap_or_default(),
            r.disposition.label().to_string(),
            pdisposition(r.disposition).to_string(),
            fmt_opt(r.score),
        ];
        record.extend(r.fpflags.iter().map(|f| format!("{f:.0}")));
        record.push(format!("{:.1}", r.model_snr));
        for v in &r.measured {
            record.push(fmt_opt(*v));
            record.push(fmt_opt(v.map(|v| (v * 0.02).abs())));
            record.push(fmt_opt(v.map(|v| -(v * 0.02).abs())));
        }
        record.push(r.delivname.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[KoiRow]) -> Result<(), Box<dyn std::error::Error>> {
    let mut fields = vec![
        Field::new("rowid", DataType::Int64, false),
        Field::new("kepid", DataType::Int64, false),
        Field::new("kepoi_name", DataType::Utf8, false),
        Field::new("kepler_name", DataType::Utf8, true),
        Field::new("koi_disposition", DataType::Utf8, false),
        Field::new("koi_pdisposition", DataType::Utf8, false),
        Field::new("koi_score", DataType::Float64, true),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.rowid))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.kepid))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.kepoi_name.as_str()))),
        Arc::new(rows.iter().map(|r| r.kepler_name.as_deref()).collect::<StringArray>()),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.disposition.label()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| pdisposition(r.disposition)))),
        Arc::new(rows.iter().map(|r| r.score).collect::<Float64Array>()),
    ];

    for (k, name) in ["koi_fpflag_nt", "koi_fpflag_ss", "koi_fpflag_co", "koi_fpflag_ec"]
        .iter()
        .enumerate()
    {
        fields.push(Field::new(*name, DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|r| r.fpflags[k]),
        )));
    }
    fields.push(Field::new("koi_model_snr", DataType::Float64, false));
    columns.push(Arc::new(Float64Array::from_iter_values(
        rows.iter().map(|r| r.model_snr),
    )));

    for (k, name) in MEASURED.iter().enumerate() {
        let values: Float64Array = rows.iter().map(|r| r.measured[k]).collect();
        let err1: Float64Array = rows
            .iter()
            .map(|r| r.measured[k].map(|v| (v * 0.02).abs()))
            .collect();
        let err2: Float64Array = rows
            .iter()
            .map(|r| r.measured[k].map(|v| -(v * 0.02).abs()))
            .collect();
        fields.push(Field::new(*name, DataType::Float64, true));
        fields.push(Field::new(format!("{name}_err1"), DataType::Float64, true));
        fields.push(Field::new(format!("{name}_err2"), DataType::Float64, true));
        columns.push(Arc::new(values));
        columns.push(Arc::new(err1));
        columns.push(Arc::new(err2));
    }

    fields.push(Field::new("koi_tce_delivname", DataType::Utf8, false));
    columns.push(Arc::new(StringArray::from_iter_values(
        rows.iter().map(|r| r.delivname),
    )));

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    let n_rows: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 3000,
    };

    let mut rng = StdRng::seed_from_u64(42);
    let rows: Vec<KoiRow> = (0..n_rows).map(|i| generate_row(i, &mut rng)).collect();

    std::fs::create_dir_all(&out_dir)?;
    let csv_path = out_dir.join(CSV_NAME);
    let parquet_path = out_dir.join(PARQUET_NAME);
    write_csv(&csv_path, &rows)?;
    write_parquet(&parquet_path, &rows)?;

    println!(
        "Wrote {} synthetic KOIs to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
