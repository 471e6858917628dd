// SPDX-License-Identifier: PMPL-1.0-or-later
//! Value encodings selected by the `marshaler` configuration tag.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;

/// Encoding used for stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marshaler {
    /// serde_json text.
    #[default]
    Json,
    /// CBOR via ciborium; compact binary.
    Cbor,
}

impl Marshaler {
    /// Tags accepted in configuration.
    pub const TAGS: [&'static str; 2] = ["json", "cbor"];

    /// Binary tag of older deployments, read as [`Marshaler::Cbor`].
    pub const LEGACY_BINARY_TAG: &'static str = "msgpack";

    pub fn as_str(self) -> &'static str {
        match self {
            Marshaler::Json => "json",
            Marshaler::Cbor => "cbor",
        }
    }

    pub fn marshal<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>, StorageError> {
        match self {
            Marshaler::Json => serde_json::to_vec(value)
                .map_err(|e| StorageError::SerializationError(e.to_string())),
            Marshaler::Cbor => {
                let mut buf = Vec::new();
                ciborium::into_writer(value, &mut buf)
                    .map_err(|e| StorageError::SerializationError(e.to_string()))?;
                Ok(buf)
            }
        }
    }

    pub fn unmarshal<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, StorageError> {
        match self {
            Marshaler::Json => serde_json::from_slice(bytes)
                .map_err(|e| StorageError::SerializationError(e.to_string())),
            Marshaler::Cbor => ciborium::from_reader(bytes)
                .map_err(|e| StorageError::SerializationError(e.to_string())),
        }
    }
}

impl fmt::Display for Marshaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marshaler {
    type Err = StorageError;

    /// An empty tag selects the default encoding. `msgpack` selects CBOR,
    /// the binary encoding this crate ships, with a warning.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "" | "json" => Ok(Marshaler::Json),
            "cbor" => Ok(Marshaler::Cbor),
            Marshaler::LEGACY_BINARY_TAG => {
                warn!(
                    marshaler = tag,
                    using = %Marshaler::Cbor,
                    "marshaler is not available, storing values as cbor"
                );
                Ok(Marshaler::Cbor)
            }
            other => Err(StorageError::InvalidConfig(format!(
                "unknown marshaler '{}', valid options are [{}]",
                other,
                Marshaler::TAGS.join(", ")
            ))),
        }
    }
}
