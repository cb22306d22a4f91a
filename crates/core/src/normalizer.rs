//! Raw snapshot normalization.
//!
//! Turns whatever an adapter returned into an [`OrderBookSnapshot`] with
//! numeric fields and equal-length sides. Empty strings and nulls become
//! absent values, never zero.

use crate::error::{BookSide, CollectorError};
use crate::model::{Level, OrderBookSnapshot, RawLevel, RawSnapshot, RawValue};
use chrono::{DateTime, Utc};

/// Normalizes a raw snapshot captured at `captured_at`.
///
/// # Errors
/// Returns `MalformedSnapshot` if neither side is present or if a non-empty
/// price/volume is not a finite number.
pub fn normalize(
    exchange: &str,
    symbol: &str,
    raw: RawSnapshot,
    captured_at: DateTime<Utc>,
) -> Result<OrderBookSnapshot, CollectorError> {
    if raw.bids.is_none() && raw.asks.is_none() {
        return Err(CollectorError::malformed(
            "payload has neither bids nor asks",
        ));
    }

    let mut bids = coerce_side(raw.bids.unwrap_or_default(), BookSide::Bid)?;
    let mut asks = coerce_side(raw.asks.unwrap_or_default(), BookSide::Ask)?;
    pad_to_equal_length(&mut bids, &mut asks);

    Ok(OrderBookSnapshot {
        exchange: exchange.to_string(),
        symbol: symbol.to_string(),
        captured_at,
        bids,
        asks,
    })
}

/// Normalizes using the current UTC time as capture timestamp.
///
/// # Errors
/// See [`normalize`].
pub fn normalize_now(
    exchange: &str,
    symbol: &str,
    raw: RawSnapshot,
) -> Result<OrderBookSnapshot, CollectorError> {
    normalize(exchange, symbol, raw, Utc::now())
}

/// Pads the shorter side with absent levels. Never truncates.
pub fn pad_to_equal_length(bids: &mut Vec<Level>, asks: &mut Vec<Level>) {
    let len = bids.len().max(asks.len());
    bids.resize(len, Level::absent());
    asks.resize(len, Level::absent());
}

fn coerce_side(levels: Vec<RawLevel>, side: BookSide) -> Result<Vec<Level>, CollectorError> {
    levels
        .into_iter()
        .enumerate()
        .map(|(index, level)| {
            let price = coerce_value(level.price.as_ref())
                .map_err(|value| invalid_number(side, index, "price", &value))?;
            let volume = coerce_value(level.volume.as_ref())
                .map_err(|value| invalid_number(side, index, "volume", &value))?;
            Ok(Level { price, volume })
        })
        .collect()
}

/// Coerces one value; `Err` carries the offending text.
fn coerce_value(value: Option<&RawValue>) -> Result<Option<f64>, String> {
    match value {
        None => Ok(None),
        Some(RawValue::Number(number)) if number.is_finite() => Ok(Some(*number)),
        Some(RawValue::Number(number)) => Err(number.to_string()),
        Some(RawValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(Some(number)),
                _ => Err(text.clone()),
            }
        }
    }
}

fn invalid_number(side: BookSide, index: usize, field: &str, value: &str) -> CollectorError {
    CollectorError::malformed(format!(
        "{side} level {index}: {field} '{value}' is not a number"
    ))
}
