//! Storage address parsing.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Scheme of on-disk sled storages.
pub const SLED_SCHEME: &str = "sled";

/// Addresses that denote an ephemeral in-memory storage.
pub const IN_MEMORY_ADDRESSES: [&str; 3] = ["sled://", "sled:///", "memory://"];

/// A parsed `scheme://[credentials@]host-or-path` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAddress {
    raw: String,
    scheme: String,
    credentials: Option<String>,
    location: String,
}

impl StorageAddress {
    /// Parse and validate an address.
    pub fn parse(address: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = address
            .split_once("://")
            .ok_or_else(|| invalid("missing '://' separator"))?;
        if scheme.is_empty() {
            return Err(invalid("missing scheme"));
        }

        let (credentials, location) = match rest.split_once('@') {
            Some((credentials, location)) => (Some(credentials.to_string()), location),
            None => (None, rest),
        };

        let parsed = Self {
            raw: address.to_string(),
            scheme: scheme.to_string(),
            credentials,
            location: location.to_string(),
        };

        if !parsed.is_memory() && scheme != SLED_SCHEME {
            return Err(invalid("unsupported scheme"));
        }
        Ok(parsed)
    }

    /// Whether this is one of the reserved in-memory addresses.
    pub fn is_memory(&self) -> bool {
        IN_MEMORY_ADDRESSES.contains(&self.raw.as_str())
    }

    /// Address scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Credentials, if any.
    pub fn credentials(&self) -> Option<&str> {
        self.credentials.as_deref()
    }

    /// Host or path part.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Directory of an on-disk storage.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.location)
    }

    /// The address as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for StorageAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            Some(credentials) => {
                let user = credentials
                    .split_once(':')
                    .map_or(credentials.as_str(), |(user, _)| user);
                write!(f, "{}://{}:***@{}", self.scheme, user, self.location)
            }
            None => f.write_str(&self.raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_addresses() {
        for address in IN_MEMORY_ADDRESSES {
            assert!(StorageAddress::parse(address).unwrap().is_memory());
        }
        assert!(!StorageAddress::parse("sled://./data").unwrap().is_memory());
    }

    #[test]
    fn test_path() {
        let address = StorageAddress::parse("sled:///tmp/ajiaco").unwrap();
        assert_eq!(address.scheme(), "sled");
        assert_eq!(address.path(), PathBuf::from("/tmp/ajiaco"));
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            StorageAddress::parse("./data"),
            Err(Error::InvalidAddress { .. })
        ));
        assert!(matches!(
            StorageAddress::parse("postgres://localhost/db"),
            Err(Error::InvalidAddress { .. })
        ));
        assert!(matches!(
            StorageAddress::parse("://data"),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_credentials_masked() {
        let address = StorageAddress::parse("sled://admin:secret@/var/data").unwrap();
        assert_eq!(address.credentials(), Some("admin:secret"));
        assert_eq!(address.location(), "/var/data");
        assert_eq!(address.to_string(), "sled://admin:***@/var/data");
        assert!(!address.to_string().contains("secret"));
    }
}
