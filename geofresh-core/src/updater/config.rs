// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration for dataset refreshes

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::kind::DatasetKind;

/// Configuration for the refresh pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Local directory holding the dataset files
    pub storage_dir: PathBuf,

    /// Remote URL for the IP geolocation database
    pub mmdb_url: String,

    /// Remote URL for the AS-number database
    pub asn_url: String,

    /// Remote URL for the GeoIP list
    pub geoip_url: String,

    /// Remote URL for the GeoSite list
    pub geosite_url: String,

    /// HTTP timeout for fetches
    pub timeout: Duration,

    /// Proxy URL (for Tor support)
    pub proxy_url: Option<String>,

    /// Maximum payload size in bytes (None = unlimited)
    pub max_payload_size: Option<u64>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        let release = "https://github.com/MetaCubeX/meta-rules-dat/releases/latest/download";
        Self {
            storage_dir: PathBuf::from("."),
            mmdb_url: format!("{}/country.mmdb", release),
            asn_url: format!("{}/GeoLite2-ASN.mmdb", release),
            geoip_url: format!("{}/geoip.dat", release),
            geosite_url: format!("{}/geosite.dat", release),
            timeout: Duration::from_secs(90),
            proxy_url: None,
            max_payload_size: None,
        }
    }
}

impl RefreshConfig {
    /// Configure the storage directory
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Configure with Tor proxy
    ///
    /// Uses the default Tor SOCKS5 proxy at 127.0.0.1:9050 and increases
    /// the timeout to account for Tor latency.
    pub fn with_tor(mut self) -> Self {
        self.proxy_url = Some("socks5://127.0.0.1:9050".to_string());
        self.timeout = Duration::from_secs(180);
        self
    }

    /// Configure with custom proxy
    pub fn with_proxy(mut self, proxy_url: String) -> Self {
        self.proxy_url = Some(proxy_url);
        self
    }

    /// Cap the accepted payload size
    pub fn with_max_payload_size(mut self, bytes: u64) -> Self {
        self.max_payload_size = Some(bytes);
        self
    }

    /// Remote endpoint for a dataset kind
    pub fn url_for(&self, kind: DatasetKind) -> &str {
        match kind {
            DatasetKind::Mmdb => &self.mmdb_url,
            DatasetKind::Asn => &self.asn_url,
            DatasetKind::GeoIp => &self.geoip_url,
            DatasetKind::GeoSite => &self.geosite_url,
        }
    }

    /// Deterministic local path for a dataset kind
    pub fn path_for(&self, kind: DatasetKind) -> PathBuf {
        self.storage_dir.join(kind.file_name())
    }
}
