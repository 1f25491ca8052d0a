//! Transport vehicle for dataset bytes
//!
//! A [`Vehicle`] fetches the freshest bytes for one dataset conditional on
//! a previously-known content hash, and persists accepted bytes to the
//! local cache path atomically. The HTTP implementation lives behind the
//! `remote-updates` feature; the sequencer only ever talks to the trait.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::hash::ContentHash;

#[cfg(feature = "remote-updates")]
use super::config::RefreshConfig;
#[cfg(feature = "remote-updates")]
use super::kind::DatasetKind;
#[cfg(feature = "remote-updates")]
use std::path::PathBuf;

/// Cooperative cancellation flag for an in-flight refresh
///
/// Cancellation is only honored before the commit phase begins; once the
/// old instance has been released the release/persist/reload sequence runs
/// to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not yet cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bytes returned by a conditional fetch, with their content hash
///
/// Invariant: a non-empty `data` always hashes to `hash`; an empty `data`
/// paired with the caller's known hash signals "unchanged".
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Downloaded payload (empty when unchanged)
    pub data: Vec<u8>,
    /// Content hash of the payload, or the echoed known hash
    pub hash: ContentHash,
}

impl FetchResult {
    /// Wrap a freshly downloaded payload, computing its hash
    pub fn new(data: Vec<u8>) -> Self {
        let hash = ContentHash::of(&data);
        FetchResult { data, hash }
    }

    /// Signal "remote content unchanged" by echoing the known hash
    pub fn unchanged(known: ContentHash) -> Self {
        FetchResult {
            data: Vec::new(),
            hash: known,
        }
    }
}

/// Transport abstraction consumed by the sequencer
pub trait Vehicle {
    /// Deterministic local cache path for this dataset
    fn path(&self) -> &Path;

    /// Conditional fetch keyed on a previously-known hash
    ///
    /// Returns the freshest bytes with their hash, or an empty buffer with
    /// the known hash when the remote content is unchanged. Must never
    /// return stale bytes under a different hash.
    fn read(&self, cancel: &CancelToken, known: &ContentHash) -> Result<FetchResult, VehicleError>;

    /// Persist bytes to the local cache path
    ///
    /// The write is atomic from the perspective of a concurrent reader:
    /// old content or new content, never a mix.
    fn write(&self, data: &[u8]) -> Result<(), VehicleError>;
}

/// Atomic file write (write to temp, then rename)
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<(), io::Error> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// HTTP transport vehicle
///
/// Downloads the full payload and compares its hash against the known one,
/// so an unchanged remote never reaches validation or the commit phase.
#[cfg(feature = "remote-updates")]
pub struct HttpVehicle {
    client: reqwest::blocking::Client,
    url: String,
    path: PathBuf,
    max_payload_size: Option<u64>,
}

#[cfg(feature = "remote-updates")]
impl HttpVehicle {
    /// Build a vehicle for one dataset kind from config
    pub fn new(
        config: &RefreshConfig,
        kind: DatasetKind,
        path: PathBuf,
    ) -> Result<Self, VehicleError> {
        Self::with_target(config, config.url_for(kind).to_string(), path)
    }

    /// Build a vehicle for an explicit URL/path pair
    pub fn with_target(
        config: &RefreshConfig,
        url: String,
        path: PathBuf,
    ) -> Result<Self, VehicleError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!(
                "Geofresh/{}",
                option_env!("CARGO_PKG_VERSION").unwrap_or("0.1.0")
            ));

        // Support proxy if configured (for Tor)
        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
            url,
            path,
            max_payload_size: config.max_payload_size,
        })
    }

    /// Remote URL this vehicle fetches from
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "remote-updates")]
impl Vehicle for HttpVehicle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, cancel: &CancelToken, known: &ContentHash) -> Result<FetchResult, VehicleError> {
        if cancel.is_cancelled() {
            return Err(VehicleError::Cancelled);
        }

        let response = self.client.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(VehicleError::Http(response.status().as_u16()));
        }

        // Check content length before downloading
        if let (Some(len), Some(max)) = (response.content_length(), self.max_payload_size) {
            if len > max {
                return Err(VehicleError::TooLarge { size: len, max });
            }
        }

        let data = response.bytes()?.to_vec();

        // Verify size after download (in case content-length was missing)
        if let Some(max) = self.max_payload_size {
            if data.len() as u64 > max {
                return Err(VehicleError::TooLarge {
                    size: data.len() as u64,
                    max,
                });
            }
        }

        if cancel.is_cancelled() {
            return Err(VehicleError::Cancelled);
        }

        let hash = ContentHash::of(&data);
        if hash.matches(known) {
            Ok(FetchResult::unchanged(*known))
        } else {
            Ok(FetchResult { data, hash })
        }
    }

    fn write(&self, data: &[u8]) -> Result<(), VehicleError> {
        atomic_write(&self.path, data)?;
        Ok(())
    }
}

/// Stub vehicle when the remote-updates feature is not enabled
#[cfg(not(feature = "remote-updates"))]
pub struct HttpVehicle {
    _private: (),
}

#[cfg(not(feature = "remote-updates"))]
impl HttpVehicle {
    /// Create an HTTP vehicle (stub - always fails)
    pub fn new() -> Result<Self, VehicleError> {
        Err(VehicleError::FeatureDisabled)
    }
}

/// Errors that can occur in the transport vehicle
#[derive(Debug, Error)]
pub enum VehicleError {
    /// HTTP error with status code
    #[error("HTTP error: {0}")]
    Http(u16),

    /// Network/request error
    #[cfg(feature = "remote-updates")]
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Payload exceeds the configured size cap
    #[error("payload too large: {size} bytes (max {max})")]
    TooLarge {
        /// Actual size in bytes
        size: u64,
        /// Maximum allowed size in bytes
        max: u64,
    },

    /// Local file IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Fetch aborted by the caller
    #[error("fetch cancelled")]
    Cancelled,

    /// Remote updates feature is not enabled
    #[error("remote updates feature is not enabled")]
    FeatureDisabled,
}
