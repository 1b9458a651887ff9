//! Row → emission transforms. One mapper per aggregate shape; the dimension
//! only decides which columns they read.

use crate::api::{Mapper, Skip};
use crate::config::{Columns, RecordFormat};
use crate::wire::{Count, Revenue};

/// Trimmed fields of a record that passed the header, blank and width checks.
fn fields<'l>(line: &'l str, columns: &Columns, format: &RecordFormat) -> Result<Vec<&'l str>, Skip> {
    let line = line.strip_prefix('\u{feff}').unwrap_or(line);
    if !format.header_prefix.is_empty() && line.starts_with(format.header_prefix.as_str()) {
        return Err(Skip::Header);
    }
    let line = line.trim();
    if line.is_empty() {
        return Err(Skip::Blank);
    }
    let fields: Vec<&str> = line.split(format.delimiter).collect();
    if fields.len() < columns.required_fields() {
        return Err(Skip::TooFewFields);
    }
    if fields[columns.key].contains('\t') {
        return Err(Skip::BadKey);
    }
    Ok(fields)
}

/// Emits `(key, 1)` for every valid record.
#[derive(Clone, Debug)]
pub struct CountMapper {
    columns: Columns,
    format: RecordFormat,
}

impl CountMapper {
    pub fn new(columns: Columns, format: RecordFormat) -> Self {
        Self { columns, format }
    }
}

impl Mapper for CountMapper {
    type Value = Count;

    fn map_record(&self, line: &str) -> Result<(String, Count), Skip> {
        let fields = fields(line, &self.columns, &self.format)?;
        Ok((fields[self.columns.key].to_string(), Count(1)))
    }
}

/// Emits `(key, revenue,1)`; rows whose revenue does not parse are dropped.
#[derive(Clone, Debug)]
pub struct RevenueMapper {
    columns: Columns,
    revenue_column: usize,
    format: RecordFormat,
}

impl RevenueMapper {
    /// `None` when `columns` has no revenue position.
    pub fn new(columns: Columns, format: RecordFormat) -> Option<Self> {
        let revenue_column = columns.revenue?;
        Some(Self { columns, revenue_column, format })
    }
}

impl Mapper for RevenueMapper {
    type Value = Revenue;

    fn map_record(&self, line: &str) -> Result<(String, Revenue), Skip> {
        let fields = fields(line, &self.columns, &self.format)?;
        let revenue = fields[self.revenue_column]
            .trim()
            .parse::<f64>()
            .map_err(|_| Skip::BadRevenue)?;
        Ok((fields[self.columns.key].to_string(), Revenue::single(revenue)))
    }
}
