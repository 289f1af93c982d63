//! Identity Value Object
//!
//! The opaque, authenticated user reference used as the addressing key
//! throughout the hub. Clients send ids either as JSON strings or numbers,
//! so deserialization accepts both and normalizes to text.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Authenticated user reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identity can be used as a delivery target.
    ///
    /// Browser clients serialize unset ids as `""`, `"undefined"` or `"null"`.
    pub fn is_addressable(&self) -> bool {
        !matches!(self.0.trim(), "" | "undefined" | "null")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        flexible_id(deserializer).map(Identity)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => {
                if let Some(v) = n.as_i64() {
                    v.to_string()
                } else if let Some(v) = n.as_u64() {
                    v.to_string()
                } else {
                    // Fractional ids are truncated, as JavaScript clients expect
                    (n.as_f64().unwrap_or_default() as i64).to_string()
                }
            }
        }
    }
}

/// Deserialize an id given as a JSON string or number into a `String`.
pub fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(RawId::into_string)
}

/// Like [`flexible_id`] for optional fields; `null` maps to `None`.
pub fn optional_flexible_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Identity>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| Identity(raw.into_string())))
}

/// Deserialize a field that clients may send as `null`; `null` maps to the default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
