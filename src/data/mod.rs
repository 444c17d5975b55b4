/// Data layer: core types, loading, filtering and per-material statistics.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawDataset
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ RawDataset  │  Vec<RawMeasurement>, read-only behind DatasetProvider
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  type + temperature window + adsorbate
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  select   │  group by material, robust stats, inner join → CombinedStats
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod select;
