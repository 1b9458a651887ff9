use crate::api::Skip;
use serde::Serialize;

#[derive(Default, Clone, Debug, PartialEq, Serialize)]
pub struct MapStats {
    pub lines_in: u64,
    pub emitted: u64,
    pub skipped_header: u64,
    pub skipped_blank: u64,
    pub skipped_short: u64,
    pub skipped_bad_key: u64,
    pub skipped_bad_revenue: u64,
    pub wall_ms: u64,
}

impl MapStats {
    pub fn record_skip(&mut self, skip: Skip) {
        match skip {
            Skip::Header => self.skipped_header += 1,
            Skip::Blank => self.skipped_blank += 1,
            Skip::TooFewFields => self.skipped_short += 1,
            Skip::BadKey => self.skipped_bad_key += 1,
            Skip::BadRevenue => self.skipped_bad_revenue += 1,
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_header + self.skipped_blank + self.skipped_short + self.skipped_bad_key + self.skipped_bad_revenue
    }

    /// Fold per-partition counters into one. Wall time is the slowest partition.
    pub fn merge(&mut self, other: &MapStats) {
        self.lines_in += other.lines_in;
        self.emitted += other.emitted;
        self.skipped_header += other.skipped_header;
        self.skipped_blank += other.skipped_blank;
        self.skipped_short += other.skipped_short;
        self.skipped_bad_key += other.skipped_bad_key;
        self.skipped_bad_revenue += other.skipped_bad_revenue;
        self.wall_ms = self.wall_ms.max(other.wall_ms);
    }
}

#[derive(Default, Clone, Debug, PartialEq, Serialize)]
pub struct SortStats {
    pub lines_in: u64,
    pub bytes_in: u64,
    pub sort_ms: u64,
}

#[derive(Default, Clone, Debug, PartialEq, Serialize)]
pub struct ReduceStats {
    pub lines_in: u64,
    pub blank_lines: u64,
    pub groups: u64,
    pub summaries: u64,
    /// Groups closed with zero orders; nothing is written for them.
    pub suppressed: u64,
    pub wall_ms: u64,
}

/// Per-phase counters of one job invocation.
#[derive(Default, Clone, Debug, Serialize)]
pub struct StatsCollector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<MapStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce: Option<ReduceStats>,
}

impl StatsCollector {
    pub fn new() -> Self { Self::default() }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_counts_and_keeps_slowest_wall() {
        let mut a = MapStats { lines_in: 3, emitted: 2, skipped_header: 1, wall_ms: 5, ..Default::default() };
        let b = MapStats { lines_in: 4, emitted: 3, skipped_bad_revenue: 1, wall_ms: 9, ..Default::default() };
        a.merge(&b);
        assert_eq!(a.lines_in, 7);
        assert_eq!(a.emitted, 5);
        assert_eq!(a.skipped(), 2);
        assert_eq!(a.wall_ms, 9);
    }

    #[test]
    fn json_omits_missing_phases() {
        let mut stats = StatsCollector::new();
        stats.reduce = Some(ReduceStats { lines_in: 2, groups: 1, summaries: 1, ..Default::default() });
        let json = stats.to_json().unwrap();
        assert!(json.contains("\"reduce\""));
        assert!(!json.contains("\"map\""));
    }
}
