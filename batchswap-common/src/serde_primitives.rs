//! Serde helpers for integer amounts.
//!
//! Amounts, deltas and limits travel as decimal strings on the wire so that 256 bit values survive
//! JSON consumers that parse numbers as doubles. For convenience plain JSON numbers are accepted
//! when deserializing.
use std::{fmt::Display, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn parse<T, E>(self) -> Result<T, E>
    where
        T: FromStr,
        T::Err: Display,
        E: de::Error,
    {
        let raw = match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        };
        T::from_str(raw.trim())
            .map_err(|e| E::custom(format!("invalid decimal amount '{raw}': {e}")))
    }
}

/// (De)serializes a single integer as a decimal string.
pub mod decimal {
    use super::*;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        StringOrNumber::deserialize(deserializer)?.parse()
    }
}

/// (De)serializes a sequence of integers as decimal strings.
pub mod decimal_vec {
    use serde::ser::SerializeSeq;

    use super::*;

    pub fn serialize<T, S>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        Vec::<StringOrNumber>::deserialize(deserializer)?
            .into_iter()
            .map(StringOrNumber::parse)
            .collect()
    }
}
