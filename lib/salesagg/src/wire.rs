//! Intermediate wire format between map and reduce: one `KEY\tVALUE` line per
//! emission. Revenue values carry `revenue,count`.

use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("expected exactly one tab separating key and value in {text:?}")]
    MissingTab { text: String },
    #[error("value {text:?} is not `revenue,count`")]
    BadValueShape { text: String },
    #[error("invalid order count {text:?}")]
    BadCount { text: String },
    #[error("invalid revenue {text:?}")]
    BadRevenue { text: String },
}

/// A value that can cross the sort barrier as text.
pub trait WireValue: Sized {
    fn encode_into(&self, out: &mut String);
    fn decode(raw: &str) -> Result<Self, WireError>;

    fn encode(&self) -> String {
        let mut s = String::new();
        self.encode_into(&mut s);
        s
    }
}

/// Count-only value; always `1` when emitted by a mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Count(pub u64);

impl WireValue for Count {
    fn encode_into(&self, out: &mut String) {
        let _ = write!(out, "{}", self.0);
    }

    fn decode(raw: &str) -> Result<Self, WireError> {
        parse_count(raw).map(Count)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Revenue {
    pub revenue: f64,
    pub count: u64,
}

impl Revenue {
    pub fn single(revenue: f64) -> Self {
        Self { revenue, count: 1 }
    }
}

impl WireValue for Revenue {
    fn encode_into(&self, out: &mut String) {
        // Debug keeps a fractional part (`100.0`) and round-trips exactly.
        let _ = write!(out, "{:?},{}", self.revenue, self.count);
    }

    fn decode(raw: &str) -> Result<Self, WireError> {
        let mut parts = raw.split(',');
        let (Some(rev), Some(cnt), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(WireError::BadValueShape { text: raw.to_string() });
        };
        let revenue = rev
            .trim()
            .parse::<f64>()
            .map_err(|_| WireError::BadRevenue { text: rev.to_string() })?;
        Ok(Self { revenue, count: parse_count(cnt)? })
    }
}

fn parse_count(raw: &str) -> Result<u64, WireError> {
    raw.trim().parse::<u64>().map_err(|_| WireError::BadCount { text: raw.to_string() })
}

/// Append `key\tvalue\n` to `out`.
pub fn encode_line<V: WireValue>(out: &mut String, key: &str, value: &V) {
    out.push_str(key);
    out.push('\t');
    value.encode_into(out);
    out.push('\n');
}

/// Split one intermediate line into key and raw value. Line terminators are
/// stripped; anything other than exactly one tab is malformed.
pub fn split_line(line: &str) -> Result<(&str, &str), WireError> {
    let line = line.trim_end_matches(['\n', '\r']);
    match line.split_once('\t') {
        Some((k, v)) if !v.contains('\t') => Ok((k, v)),
        _ => Err(WireError::MissingTab { text: line.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_keeps_fraction_on_the_wire() {
        let mut s = String::new();
        encode_line(&mut s, "India", &Revenue::single(100.0));
        assert_eq!(s, "India\t100.0,1\n");
    }

    #[test]
    fn count_line() {
        let mut s = String::new();
        encode_line(&mut s, "Asia", &Count(1));
        assert_eq!(s, "Asia\t1\n");
    }

    #[test]
    fn split_strips_crlf() {
        assert_eq!(split_line("k\t1\r\n").unwrap(), ("k", "1"));
    }

    #[test]
    fn split_rejects_missing_or_extra_tab() {
        assert!(matches!(split_line("no tab here"), Err(WireError::MissingTab { .. })));
        assert!(matches!(split_line("a\tb\tc"), Err(WireError::MissingTab { .. })));
    }

    #[test]
    fn revenue_decode_errors() {
        assert!(matches!(Revenue::decode("12.5"), Err(WireError::BadValueShape { .. })));
        assert!(matches!(Revenue::decode("1,2,3"), Err(WireError::BadValueShape { .. })));
        assert!(matches!(Revenue::decode("abc,1"), Err(WireError::BadRevenue { .. })));
        assert!(matches!(Revenue::decode("1.0,x"), Err(WireError::BadCount { .. })));
        assert_eq!(Revenue::decode(" 2.5 , 3 ").unwrap(), Revenue { revenue: 2.5, count: 3 });
    }

    #[test]
    fn negative_count_is_malformed() {
        assert!(matches!(Count::decode("-1"), Err(WireError::BadCount { .. })));
    }
}
