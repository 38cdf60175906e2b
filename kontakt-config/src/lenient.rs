//! Scalars that also accept their string form.
//!
//! Environment overlays always arrive as strings (`KONTAKT__RUN__SUBMIT=true`),
//! while YAML yields typed values. Blanket `try_parsing` would turn phone
//! numbers and zip codes into integers, so parsing is opt-in per field.

use std::fmt::Display;
use std::str::FromStr;

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw<T> {
    Typed(T),
    Text(String),
}

fn from_raw<T, E>(raw: Raw<T>) -> Result<T, E>
where
    T: FromStr,
    T::Err: Display,
    E: Error,
{
    match raw {
        Raw::Typed(v) => Ok(v),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| E::custom(format!("cannot parse {s:?}: {e}"))),
    }
}

pub fn parse<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    from_raw(Raw::<T>::deserialize(d)?)
}

pub fn parse_opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    Option::<Raw<T>>::deserialize(d)?
        .map(from_raw)
        .transpose()
}
