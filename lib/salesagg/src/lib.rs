//! Grouped sales aggregates (count, revenue total, revenue average) computed
//! as map → sort → reduce over delimiter-separated records.

pub mod api;
pub mod config;
pub mod constants;
pub mod fold;
pub mod io;
pub mod mappers;
pub mod reducers;
pub mod runtime;
pub mod sort;
pub mod stats;
pub mod utils;
pub mod wire;

pub use api::{emissions, Mapper, Reducer, Skip};
pub use config::{Columns, Dimension, Measure, Overrides, PipelineConfig, RecordFormat};
pub use fold::{fold_sorted, GroupFold, OrderPolicy, ReduceError};
pub use mappers::{CountMapper, RevenueMapper};
pub use reducers::{CountReducer, CountSummary, RevenueReducer, RevenueSummary, SummaryLayout};
pub use runtime::{run_local, run_map, run_reduce, DimensionJob};
pub use wire::{Count, Revenue, WireError, WireValue};
