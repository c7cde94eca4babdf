/// Data layer: table types, loading, source selection, and memoization.
///
/// Architecture:
/// ```text
///  upload / default .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  source   │  upload wins over the default dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  content hash → parsed RawTable (+ preprocessed form)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → RawTable
///   └──────────┘
/// ```

pub mod cache;
pub mod loader;
pub mod model;
pub mod source;
