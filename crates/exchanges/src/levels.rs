//! Wire-level order book entries.
//!
//! Exchanges send levels either as `[price, volume, ...]` arrays or as
//! `{price, quantity}` objects, with strings, numbers or nulls inside.

use depthwatch_core::{RawLevel, RawValue};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireLevel {
    /// `[price, volume]`, extra trailing fields ignored
    Array(Vec<Option<RawValue>>),
    /// `{"price": .., "quantity": ..}`
    Object {
        price: Option<RawValue>,
        #[serde(alias = "volume", alias = "amount", alias = "size")]
        quantity: Option<RawValue>,
    },
}

impl From<WireLevel> for RawLevel {
    fn from(level: WireLevel) -> Self {
        match level {
            WireLevel::Array(values) => {
                let mut values = values.into_iter();
                Self {
                    price: values.next().flatten(),
                    volume: values.next().flatten(),
                }
            }
            WireLevel::Object { price, quantity } => Self {
                price,
                volume: quantity,
            },
        }
    }
}

/// Converts an optional wire side; `None` stays `None` so the normalizer can
/// tell a missing side from an empty one.
pub fn to_raw_side(levels: Option<Vec<WireLevel>>) -> Option<Vec<RawLevel>> {
    levels.map(|levels| levels.into_iter().map(RawLevel::from).collect())
}
