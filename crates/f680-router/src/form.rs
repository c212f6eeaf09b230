//! `application/x-www-form-urlencoded` request bodies
//!
//! Fields are emitted in ascending key order. The signature covers the exact
//! encoded bytes, so the encoding must be deterministic.

use std::collections::BTreeMap;
use url::form_urlencoded::byte_serialize;

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Default)]
pub(crate) struct FormBody {
    fields: BTreeMap<String, Vec<u8>>,
}

impl FormBody {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value
    pub(crate) fn set(&mut self, key: impl Into<String>, value: impl AsRef<[u8]>) -> &mut Self {
        self.fields.insert(key.into(), value.as_ref().to_vec());
        self
    }

    pub(crate) fn encode(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    byte_serialize(key.as_bytes()).collect::<String>(),
                    byte_serialize(value).collect::<String>()
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}
