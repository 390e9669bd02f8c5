//! Target classification shared by command sets and form schemas.
//!
//! A [`Variant`] pairs the connection [`Transport`] an agent talks over with
//! the [`OsFamily`] it runs on. Both the command registry and the form
//! builder key their output by this same taxonomy.
//!
//! # Examples
//!
//! ```
//! use agent_schema_core::{OsFamily, Transport, Variant};
//!
//! let variant: Variant = "http/windows".parse().unwrap();
//! assert_eq!(variant, Variant::new(Transport::Http, OsFamily::Windows));
//! assert_eq!(variant.to_string(), "http/windows");
//!
//! // Listener names are accepted for the transport part.
//! let pivot: Variant = "BeaconSMB/windows".parse().unwrap();
//! assert_eq!(pivot.transport, Transport::Smb);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VariantParseError;

/// Connection transport between the agent and the console side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// HTTP(S) based callback transport.
    Http,
    /// SMB named-pipe pivot.
    Smb,
    /// Raw TCP pivot or bind.
    Tcp,
}

impl Transport {
    /// All transports in declaration order.
    pub const ALL: [Transport; 3] = [Transport::Http, Transport::Smb, Transport::Tcp];

    /// Lowercase identifier used in the display form.
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Smb => "smb",
            Transport::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = VariantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "beaconhttp" => Ok(Transport::Http),
            "smb" | "beaconsmb" => Ok(Transport::Smb),
            "tcp" | "beacontcp" | "gophertcp" => Ok(Transport::Tcp),
            _ => Err(VariantParseError::UnknownTransport(s.to_string())),
        }
    }
}

/// Operating system family of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Windows,
    Linux,
    Macos,
}

impl OsFamily {
    /// All OS families in declaration order.
    pub const ALL: [OsFamily; 3] = [OsFamily::Windows, OsFamily::Linux, OsFamily::Macos];

    /// Lowercase identifier used in the display form.
    pub fn as_str(self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Linux => "linux",
            OsFamily::Macos => "macos",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsFamily {
    type Err = VariantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(OsFamily::Windows),
            "linux" => Ok(OsFamily::Linux),
            "macos" | "mac" | "darwin" => Ok(OsFamily::Macos),
            _ => Err(VariantParseError::UnknownOs(s.to_string())),
        }
    }
}

/// Transport × OS classification key.
///
/// Ordering is transport first, then OS, which keeps listings stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variant {
    pub transport: Transport,
    pub os: OsFamily,
}

impl Variant {
    pub const fn new(transport: Transport, os: OsFamily) -> Self {
        Self { transport, os }
    }

    /// Full transport × OS product in stable order.
    ///
    /// ```
    /// use agent_schema_core::Variant;
    ///
    /// let all: Vec<Variant> = Variant::all().collect();
    /// assert_eq!(all.len(), 9);
    /// assert_eq!(all[0].to_string(), "http/windows");
    /// ```
    pub fn all() -> impl Iterator<Item = Variant> {
        Transport::ALL
            .into_iter()
            .flat_map(|t| OsFamily::ALL.into_iter().map(move |os| Variant::new(t, os)))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.transport, self.os)
    }
}

impl FromStr for Variant {
    type Err = VariantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (transport, os) = s
            .split_once('/')
            .ok_or_else(|| VariantParseError::Malformed(s.to_string()))?;
        Ok(Variant::new(transport.parse()?, os.parse()?))
    }
}
