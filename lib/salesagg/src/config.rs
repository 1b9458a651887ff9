//! Job configuration: which dimension to aggregate, where its columns live,
//! and how input records are delimited. Defaults come from the sales dataset
//! layout, then environment variables, then explicit overrides from the CLI.

use crate::constants::*;
use crate::fold::OrderPolicy;
use crate::reducers::SummaryLayout;
use crate::utils::{env_usize, env_var_truthy, parse_delimiter};
use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    Region,
    Country,
    Product,
    Temporal,
    Revenue,
}

/// Aggregate shape tracked for a dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measure {
    Count,
    Revenue,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Region,
        Dimension::Country,
        Dimension::Product,
        Dimension::Temporal,
        Dimension::Revenue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Region => "region",
            Dimension::Country => "country",
            Dimension::Product => "product",
            Dimension::Temporal => "temporal",
            Dimension::Revenue => "revenue",
        }
    }

    pub fn measure(self) -> Measure {
        match self {
            Dimension::Region | Dimension::Temporal => Measure::Count,
            Dimension::Country | Dimension::Product | Dimension::Revenue => Measure::Revenue,
        }
    }

    /// Column positions in the sales CSV:
    /// Region(0), Country(1), Item Type(2), .., Order Date(5), .., Total Revenue(11).
    pub fn default_columns(self) -> Columns {
        match self {
            Dimension::Region => Columns { key: 0, revenue: None, min_fields: 1 },
            Dimension::Country => Columns { key: 1, revenue: Some(11), min_fields: 12 },
            Dimension::Product => Columns { key: 2, revenue: Some(11), min_fields: 12 },
            Dimension::Temporal => Columns { key: 5, revenue: None, min_fields: 6 },
            Dimension::Revenue => Columns { key: 5, revenue: Some(11), min_fields: 12 },
        }
    }

    pub fn layout(self) -> SummaryLayout {
        match self {
            Dimension::Region | Dimension::Temporal => SummaryLayout::CountOnly,
            Dimension::Country => SummaryLayout::OrdersFirst,
            Dimension::Product | Dimension::Revenue => SummaryLayout::RevenueFirst,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown dimension {0:?} (expected one of region, country, product, temporal, revenue)")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDimension(s.to_string()))
    }
}

/// Field positions used by a mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Columns {
    pub key: usize,
    pub revenue: Option<usize>,
    pub min_fields: usize,
}

impl Columns {
    /// Records need at least this many fields; never less than what the key
    /// and revenue positions index into.
    pub fn required_fields(&self) -> usize {
        let needed = self.revenue.map_or(self.key, |r| r.max(self.key)) + 1;
        self.min_fields.max(needed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordFormat {
    pub delimiter: char,
    pub header_prefix: String,
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self { delimiter: DEFAULT_DELIMITER, header_prefix: DEFAULT_HEADER_PREFIX.to_string() }
    }
}

/// Per-invocation overrides, usually straight from CLI flags.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub delimiter: Option<String>,
    pub header_prefix: Option<String>,
    pub key_column: Option<usize>,
    pub revenue_column: Option<usize>,
    pub min_fields: Option<usize>,
    pub allow_unsorted: bool,
    pub threads: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub dimension: Dimension,
    pub columns: Columns,
    pub format: RecordFormat,
    pub order: OrderPolicy,
    pub threads: Option<usize>,
}

impl PipelineConfig {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            columns: dimension.default_columns(),
            format: RecordFormat::default(),
            order: OrderPolicy::Reject,
            threads: None,
        }
    }

    /// Defaults, then `SALESAGG_*` environment variables.
    pub fn from_env(dimension: Dimension) -> Result<Self> {
        let mut cfg = Self::new(dimension);
        if let Ok(raw) = std::env::var(ENV_DELIMITER) {
            cfg.format.delimiter = delimiter_or_bail(&raw, ENV_DELIMITER)?;
        }
        if let Ok(prefix) = std::env::var(ENV_HEADER_PREFIX) {
            cfg.format.header_prefix = prefix;
        }
        if env_var_truthy(ENV_ALLOW_UNSORTED) {
            cfg.order = OrderPolicy::Allow;
        }
        cfg.threads = env_usize(ENV_THREADS).filter(|&n| n > 0);
        Ok(cfg)
    }

    pub fn apply(mut self, o: &Overrides) -> Result<Self> {
        if let Some(raw) = &o.delimiter {
            self.format.delimiter = delimiter_or_bail(raw, "--delimiter")?;
        }
        if let Some(prefix) = &o.header_prefix {
            self.format.header_prefix = prefix.clone();
        }
        if let Some(key) = o.key_column {
            self.columns.key = key;
        }
        match (o.revenue_column, self.dimension.measure()) {
            (Some(col), Measure::Revenue) => self.columns.revenue = Some(col),
            (Some(col), Measure::Count) => {
                warn!(dimension = %self.dimension, column = col, "revenue column ignored for count-only dimension")
            }
            (None, _) => {}
        }
        if let Some(n) = o.min_fields {
            self.columns.min_fields = n;
        }
        if o.allow_unsorted {
            self.order = OrderPolicy::Allow;
        }
        if let Some(n) = o.threads.filter(|&n| n > 0) {
            self.threads = Some(n);
        }
        Ok(self)
    }
}

fn delimiter_or_bail(raw: &str, origin: &str) -> Result<char> {
    match parse_delimiter(raw) {
        Some('\n') | Some('\r') => bail!("{origin}: line terminators cannot be field delimiters"),
        Some(c) => Ok(c),
        None => bail!("{origin}: delimiter must be a single character, got {raw:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_names_round_trip() {
        for d in Dimension::ALL {
            assert_eq!(d.name().parse::<Dimension>().unwrap(), d);
        }
        assert_eq!("Country".parse::<Dimension>().unwrap(), Dimension::Country);
        assert!("planet".parse::<Dimension>().is_err());
    }

    #[test]
    fn required_fields_covers_indexed_columns() {
        let cols = Columns { key: 5, revenue: Some(11), min_fields: 3 };
        assert_eq!(cols.required_fields(), 12);
        let cols = Columns { key: 0, revenue: None, min_fields: 1 };
        assert_eq!(cols.required_fields(), 1);
        let cols = Columns { key: 0, revenue: None, min_fields: 4 };
        assert_eq!(cols.required_fields(), 4);
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let o = Overrides {
            delimiter: Some(";".into()),
            key_column: Some(3),
            revenue_column: Some(9),
            allow_unsorted: true,
            ..Default::default()
        };
        let cfg = PipelineConfig::new(Dimension::Country).apply(&o).unwrap();
        assert_eq!(cfg.format.delimiter, ';');
        assert_eq!(cfg.columns, Columns { key: 3, revenue: Some(9), min_fields: 12 });
        assert_eq!(cfg.order, OrderPolicy::Allow);
    }

    #[test]
    fn revenue_override_ignored_for_counts() {
        let o = Overrides { revenue_column: Some(9), ..Default::default() };
        let cfg = PipelineConfig::new(Dimension::Region).apply(&o).unwrap();
        assert_eq!(cfg.columns.revenue, None);
    }

    #[test]
    fn bad_delimiter_is_rejected() {
        let o = Overrides { delimiter: Some("ab".into()), ..Default::default() };
        assert!(PipelineConfig::new(Dimension::Region).apply(&o).is_err());
    }
}
