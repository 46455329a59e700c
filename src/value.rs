use core::fmt::Debug;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A binary consensus value.
///
/// `Unknown` is the abstain sentinel: it travels over the wire like any
/// other value but is invisible to tallying.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Zero,
    One,
    Unknown,
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Zero => write!(f, "0"),
            Value::One => write!(f, "1"),
            Value::Unknown => write!(f, "?"),
        }
    }
}

impl Value {
    pub fn is_informative(&self) -> bool {
        !matches!(self, Value::Unknown)
    }

    /// Uniform coin over the two binary values, used to break ties.
    pub fn coin_flip(rng: &mut impl Rng) -> Self {
        match rng.gen() {
            true => Value::One,
            false => Value::Zero,
        }
    }
}
