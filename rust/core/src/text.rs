// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lenient field deserializers.
//!
//! Browser forms and model output both mix `"18"` and `18` freely, so text
//! fields accept either and keep the value as written.

use serde::de::{self, Deserialize, Deserializer};
use serde_json::Value;

fn value_to_text<E: de::Error>(value: Value) -> Result<String, E> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(E::custom(format!("expected text or number, got {other}"))),
    }
}

/// String or number, `null` becomes empty.
pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    value_to_text(Value::deserialize(deserializer)?)
}

/// Like [`text`] but `null` and blank values become `None`.
pub(crate) fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let text = value_to_text::<D::Error>(Value::deserialize(deserializer)?)?;
    Ok(if text.trim().is_empty() { None } else { Some(text) })
}

/// Non-negative integer given as a JSON number or a numeric string.
pub(crate) fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| de::Error::custom(format!("invalid quantity: {value}")))
}
