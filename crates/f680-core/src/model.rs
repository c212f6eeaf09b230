//! Router data model
//!
//! [`DhcpSourceKind`] has three representations: a small integer on the
//! router wire, a lowercase name in configuration and logs, and the enum
//! itself. Conversions between them are explicit and validated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Router-side classification of a LAN client's DHCP lease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DhcpSourceKind {
    /// No classification
    #[default]
    Unset,
    /// Lease is treated as local-only
    Local,
    /// Lease is internet-routable
    Internet,
}

impl DhcpSourceKind {
    /// Wire integer sent as `ProcFlag`
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Unset => 0,
            Self::Local => 1,
            Self::Internet => 2,
        }
    }

    /// Parse a wire integer, rejecting unknown values
    pub fn from_wire(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Unset),
            1 => Ok(Self::Local),
            2 => Ok(Self::Internet),
            other => Err(Error::parse(format!("unknown DHCP source kind: {}", other))),
        }
    }

    /// Parse the textual `ProcFlag` value reported by the router
    pub fn from_router(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(Self::Unset);
        }

        let wire: u8 = value
            .parse()
            .map_err(|_| Error::parse(format!("unknown DHCP source kind: {:?}", value)))?;
        Self::from_wire(wire)
    }

    /// Configuration/log name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Local => "local",
            Self::Internet => "internet",
        }
    }
}

impl fmt::Display for DhcpSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DhcpSourceKind {
    type Err = Error;

    /// Accepts names plus the legacy numeric spellings
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" | "0" => Ok(Self::Unset),
            "local" | "1" => Ok(Self::Local),
            "internet" | "2" => Ok(Self::Internet),
            other => Err(Error::parse(format!("unknown DHCP source kind: {:?}", other))),
        }
    }
}

impl TryFrom<String> for DhcpSourceKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DhcpSourceKind> for String {
    fn from(kind: DhcpSourceKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One DHCP source entry as managed by the router
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DhcpSource {
    /// Router-assigned instance ID (`_InstID`)
    pub id: String,
    /// Classification flag (`ProcFlag`)
    pub proc_flag: DhcpSourceKind,
    /// Vendor class identifier, the stable matching key
    pub vendor_class_id: String,
}

impl DhcpSource {
    /// Create a new source entry
    pub fn new(
        id: impl Into<String>,
        proc_flag: DhcpSourceKind,
        vendor_class_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            proc_flag,
            vendor_class_id: vendor_class_id.into(),
        }
    }

    /// Copy of this entry with the flag replaced
    pub fn with_proc_flag(&self, proc_flag: DhcpSourceKind) -> Self {
        Self {
            proc_flag,
            ..self.clone()
        }
    }
}

/// Desired flag per vendor class identifier
pub type DesiredSources = BTreeMap<String, DhcpSourceKind>;
