use crate::wire::{WireError, WireValue};
use std::fmt::Display;

// ========== Core MapReduce traits ==========

/// Why a mapper produced no emission for a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Skip {
    Header,
    Blank,
    TooFewFields,
    /// Key contains a tab and cannot be written to the wire.
    BadKey,
    BadRevenue,
}

pub trait Mapper {
    type Value: WireValue;

    /// Turn one raw line into at most one emission. Malformed lines are never
    /// an error, only a `Skip`.
    fn map_record(&self, line: &str) -> Result<(String, Self::Value), Skip>;

    fn do_map<I, F>(&self, input: I, emit: &mut F)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        F: FnMut(String, Self::Value),
    {
        for line in input {
            if let Ok((k, v)) = self.map_record(line.as_ref()) {
                emit(k, v);
            }
        }
    }
}

/// Lazy emission stream over a sequence of lines.
pub fn emissions<'m, M, I>(mapper: &'m M, input: I) -> impl Iterator<Item = (String, M::Value)> + 'm
where
    M: Mapper,
    I: IntoIterator + 'm,
    I::Item: AsRef<str>,
{
    input.into_iter().filter_map(move |line| mapper.map_record(line.as_ref()).ok())
}

/// Reducer folds one key's values into an accumulator and finalizes it into at
/// most one output record. Grouping itself is driven by [`crate::fold::GroupFold`].
pub trait Reducer {
    type ValueIn: WireValue;
    type Acc;
    type Out: Display;

    fn open(&self, first: Self::ValueIn) -> Self::Acc;
    fn fold(&self, acc: &mut Self::Acc, value: Self::ValueIn);
    /// `None` suppresses the group (e.g. zero orders, nothing to average).
    fn finish(&self, key: &str, acc: Self::Acc) -> Option<Self::Out>;

    fn decode(&self, raw: &str) -> Result<Self::ValueIn, WireError> {
        Self::ValueIn::decode(raw)
    }

    /// Reduce a complete, already-collected group.
    fn do_reduce<I, F>(&self, key: &str, values: I, emit: &mut F)
    where
        I: IntoIterator<Item = Self::ValueIn>,
        F: FnMut(Self::Out),
    {
        let mut values = values.into_iter();
        let Some(first) = values.next() else { return };
        let mut acc = self.open(first);
        for v in values {
            self.fold(&mut acc, v);
        }
        if let Some(out) = self.finish(key, acc) {
            emit(out);
        }
    }
}
