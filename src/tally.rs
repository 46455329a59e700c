use std::cmp::Ordering;

use crate::Value;

/// The count of informative values in a collection.
///
/// `Unknown` entries are skipped entirely, so an all-abstain collection
/// ties at 0/0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub zeros: usize,
    pub ones: usize,
}

impl Tally {
    pub fn count<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut tally = Tally::default();
        for value in values {
            match value {
                Value::Zero => tally.zeros += 1,
                Value::One => tally.ones += 1,
                Value::Unknown => (),
            }
        }
        tally
    }

    /// The value held by a strict majority of the counted entries, or
    /// `None` on an exact tie.
    pub fn majority(&self) -> Option<Value> {
        match self.zeros.cmp(&self.ones) {
            Ordering::Greater => Some(Value::Zero),
            Ordering::Less => Some(Value::One),
            Ordering::Equal => None,
        }
    }
}
