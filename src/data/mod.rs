/// Data layer: core types, loading, classification and filtering.
///
/// Architecture:
/// ```text
///  sheet URL / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch / parse → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  classify │  column → ColumnKind (text dates parsed first)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ predicate  │  kind + Constraint → row predicate
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  AND of enabled columns → filtered Table
///   └──────────┘
/// ```

pub mod classify;
pub mod filter;
pub mod loader;
pub mod model;
pub mod predicate;
