//! One-row environment stamp written when a storage is created.

use chrono::{Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Environment and version information captured at stamping time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Operating system.
    pub platform: String,
    /// CPU architecture.
    pub architecture: String,
    /// Text encoding used by the process.
    pub system_encoding: String,
    /// Local UTC offset.
    pub system_time_zone: String,
    /// Package name.
    pub package: String,
    /// Package version.
    pub version: String,
    /// Creation time (RFC 3339, UTC).
    pub utc_created_at: String,
}

impl Stamp {
    /// Capture the current environment.
    pub fn collect() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            system_encoding: "utf-8".to_string(),
            system_time_zone: Local::now().offset().to_string(),
            package: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            utc_created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect() {
        let stamp = Stamp::collect();
        assert_eq!(stamp.platform, std::env::consts::OS);
        assert_eq!(stamp.package, "ajiaco-core");
        assert!(stamp.utc_created_at.ends_with('Z'));

        let decoded = Stamp::from_bytes(&stamp.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, stamp);
    }
}
