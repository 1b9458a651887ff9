//! Streaming grouped fold over a key-sorted emission stream.
//!
//! The fold is a small state machine: no open group, or one open group with its
//! accumulator. A different key flushes the open group; `finish` flushes the
//! last one. Callers must hand in a stream where all emissions of a key are
//! contiguous (the sort barrier's job). Under [`OrderPolicy::Reject`] a key that
//! reappears after its group was closed is an error; under
//! [`OrderPolicy::Allow`] it simply starts another group.

use crate::api::Reducer;
use crate::stats::ReduceStats;
use crate::wire::{split_line, WireError};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderPolicy {
    Reject,
    Allow,
}

#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: WireError,
    },
    #[error("line {line}: key {key:?} reappears after its group was closed; input is not sorted by key")]
    OutOfOrder { line: u64, key: String },
}

struct OpenGroup<A> {
    key: String,
    acc: A,
}

pub struct GroupFold<'r, R: Reducer> {
    reducer: &'r R,
    open: Option<OpenGroup<R::Acc>>,
    policy: OrderPolicy,
    closed: HashSet<String>,
    stats: ReduceStats,
}

impl<'r, R: Reducer> GroupFold<'r, R> {
    pub fn new(reducer: &'r R, policy: OrderPolicy) -> Self {
        Self { reducer, open: None, policy, closed: HashSet::new(), stats: ReduceStats::default() }
    }

    /// Feed one decoded emission. Returns the summary of the group this
    /// emission closed, if any.
    pub fn push(&mut self, key: &str, value: R::ValueIn) -> Result<Option<R::Out>, ReduceError> {
        self.stats.lines_in += 1;
        if let Some(open) = self.open.as_mut() {
            if open.key == key {
                self.reducer.fold(&mut open.acc, value);
                return Ok(None);
            }
        }
        if self.policy == OrderPolicy::Reject && self.closed.contains(key) {
            return Err(ReduceError::OutOfOrder { line: self.stats.lines_in, key: key.to_string() });
        }
        let flushed = self.flush();
        self.open = Some(OpenGroup { key: key.to_string(), acc: self.reducer.open(value) });
        Ok(flushed)
    }

    /// Decode and feed one raw `KEY\tVALUE` line. Empty lines are counted and
    /// ignored.
    pub fn push_line(&mut self, line: &str) -> Result<Option<R::Out>, ReduceError> {
        if line.trim_end_matches(['\n', '\r']).is_empty() {
            self.stats.lines_in += 1;
            self.stats.blank_lines += 1;
            return Ok(None);
        }
        let line_no = self.stats.lines_in + 1;
        let malformed = |source: WireError| ReduceError::Malformed { line: line_no, source };
        let (key, raw) = split_line(line).map_err(malformed)?;
        let value = self.reducer.decode(raw).map_err(malformed)?;
        self.push(key, value)
    }

    /// Close the open group, if any, and return its summary.
    pub fn flush(&mut self) -> Option<R::Out> {
        let OpenGroup { key, acc } = self.open.take()?;
        self.stats.groups += 1;
        let out = self.reducer.finish(&key, acc);
        match out {
            Some(_) => self.stats.summaries += 1,
            None => self.stats.suppressed += 1,
        }
        if self.policy == OrderPolicy::Reject {
            self.closed.insert(key);
        }
        out
    }

    /// End of input: flush the last group and hand back the counters.
    pub fn finish(mut self) -> (Option<R::Out>, ReduceStats) {
        let out = self.flush();
        (out, self.stats)
    }

    pub fn stats(&self) -> &ReduceStats {
        &self.stats
    }
}

/// Fold an in-memory sorted sequence of emissions into summaries.
pub fn fold_sorted<R, I, K>(reducer: &R, emissions: I, policy: OrderPolicy) -> Result<Vec<R::Out>, ReduceError>
where
    R: Reducer,
    I: IntoIterator<Item = (K, R::ValueIn)>,
    K: AsRef<str>,
{
    let mut fold = GroupFold::new(reducer, policy);
    let mut out = Vec::new();
    for (k, v) in emissions {
        out.extend(fold.push(k.as_ref(), v)?);
    }
    out.extend(fold.finish().0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducers::{CountReducer, RevenueReducer};
    use crate::wire::{Count, Revenue};

    fn counts(keys: &[&str]) -> Vec<(String, Count)> {
        keys.iter().map(|k| (k.to_string(), Count(1))).collect()
    }

    #[test]
    fn empty_stream_emits_nothing() {
        let out = fold_sorted(&CountReducer, counts(&[]), OrderPolicy::Reject).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn last_group_is_flushed() {
        let out = fold_sorted(&CountReducer, counts(&["a", "a", "b"]), OrderPolicy::Reject).unwrap();
        let lines: Vec<String> = out.iter().map(|s| s.to_string()).collect();
        assert_eq!(lines, vec!["a\t2", "b\t1"]);
    }

    #[test]
    fn single_emission_stream() {
        let out = fold_sorted(&CountReducer, counts(&["only"]), OrderPolicy::Reject).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].orders, 1);
    }

    #[test]
    fn reappearing_key_is_rejected() {
        let err = fold_sorted(&CountReducer, counts(&["a", "b", "a"]), OrderPolicy::Reject).unwrap_err();
        match err {
            ReduceError::OutOfOrder { line, key } => {
                assert_eq!(line, 3);
                assert_eq!(key, "a");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn reappearing_key_is_a_new_group_when_allowed() {
        let out = fold_sorted(&CountReducer, counts(&["a", "b", "a"]), OrderPolicy::Allow).unwrap();
        let lines: Vec<String> = out.iter().map(|s| s.to_string()).collect();
        assert_eq!(lines, vec!["a\t1", "b\t1", "a\t1"]);
    }

    #[test]
    fn flush_is_returned_on_key_change() {
        let r = CountReducer;
        let mut fold = GroupFold::new(&r, OrderPolicy::Reject);
        assert!(fold.push("a", Count(1)).unwrap().is_none());
        assert!(fold.push("a", Count(1)).unwrap().is_none());
        let closed = fold.push("b", Count(1)).unwrap().unwrap();
        assert_eq!(closed.key, "a");
        assert_eq!(closed.orders, 2);
        let (last, stats) = fold.finish();
        assert_eq!(last.unwrap().key, "b");
        assert_eq!(stats.lines_in, 3);
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.summaries, 2);
    }

    #[test]
    fn zero_count_groups_are_counted_as_suppressed() {
        let r = RevenueReducer::default();
        let input = vec![
            ("a", Revenue { revenue: 5.0, count: 0 }),
            ("b", Revenue::single(5.0)),
        ];
        let mut fold = GroupFold::new(&r, OrderPolicy::Reject);
        let mut out = Vec::new();
        for (k, v) in input {
            out.extend(fold.push(k, v).unwrap());
        }
        let (last, stats) = fold.finish();
        out.extend(last);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "b");
        assert_eq!(stats.suppressed, 1);
    }

    #[test]
    fn malformed_line_reports_position() {
        let r = RevenueReducer::default();
        let mut fold = GroupFold::new(&r, OrderPolicy::Reject);
        fold.push_line("India\t100.0,1\n").unwrap();
        let err = fold.push_line("India 50.0,1\n").unwrap_err();
        assert!(matches!(err, ReduceError::Malformed { line: 2, source: WireError::MissingTab { .. } }));
        assert!(err.to_string().starts_with("line 2:"));
    }

    #[test]
    fn blank_lines_keep_line_numbers_physical() {
        let r = CountReducer;
        let mut fold = GroupFold::new(&r, OrderPolicy::Reject);
        fold.push_line("a\t1").unwrap();
        fold.push_line("").unwrap();
        let err = fold.push_line("a\tone").unwrap_err();
        assert!(matches!(err, ReduceError::Malformed { line: 3, source: WireError::BadCount { .. } }));
        assert_eq!(fold.stats().blank_lines, 1);
    }
}
