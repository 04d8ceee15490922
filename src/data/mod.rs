//! Data layer: schema, loading, caching, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .xlsx / .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  read file → RawTable → Dataset (schema resolved once)
//!   └──────────┘
//!        │          cached per source path (cache)
//!        ▼
//!   ┌──────────────┐
//!   │   Dataset     │  Vec<Record>, typed fields + passthrough cells
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  FilterCriteria → FilteredView (indices into Dataset)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ summary   │  FilteredView → Summary (KPIs, grouped totals)
//!   └──────────┘
//! ```

pub mod cache;
pub mod coerce;
pub mod filter;
pub mod loader;
pub mod model;
pub mod summary;
