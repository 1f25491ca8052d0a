// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Commit & reload sequencer
//!
//! One refresh is a two-phase operation. Phase 1 (hash check, fetch,
//! validation) has no side effects and can stop at any point leaving the
//! local file and loaded instance untouched. Phase 2 (release, persist,
//! reload) runs to completion once entered: the old instance must be
//! closed before its file is overwritten, and the reload hook fires on
//! every phase-2 exit path so the registry never stays pointed at a
//! closed instance.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, TryLockError};

use thiserror::Error;
use tracing::{debug, info};

use super::config::RefreshConfig;
use super::hash::ContentHash;
use super::kind::DatasetKind;
use super::registry::InstanceRegistry;
use super::validate::{validate, FormatError};
use super::vehicle::{CancelToken, Vehicle, VehicleError};

#[cfg(feature = "remote-updates")]
use super::vehicle::HttpVehicle;

/// What a successful refresh did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Remote content matched the local file; nothing written, nothing reloaded
    Unchanged,
    /// New content was validated, persisted and reloaded
    Updated,
}

/// Drives conditional refreshes for all dataset kinds
///
/// Kinds are independent and may be refreshed concurrently; within one
/// kind at most one refresh is in flight, enforced by a per-kind lock.
pub struct Updater<R: InstanceRegistry> {
    config: RefreshConfig,
    registry: R,
    in_flight: [Mutex<()>; 4],
}

impl<R: InstanceRegistry> Updater<R> {
    /// Create an updater over a registry
    pub fn new(config: RefreshConfig, registry: R) -> Self {
        Updater {
            config,
            registry,
            in_flight: Default::default(),
        }
    }

    /// The configuration this updater resolves URLs and paths from
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// The registry this updater releases and reloads instances through
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Refresh one dataset kind through an explicit transport vehicle
    pub fn refresh_with_vehicle<V: Vehicle>(
        &self,
        kind: DatasetKind,
        vehicle: &V,
        cancel: &CancelToken,
    ) -> Result<RefreshOutcome, RefreshError> {
        let _guard = match self.in_flight[kind.index()].try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(RefreshError::InProgress { kind }),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        self.run(kind, vehicle, cancel)
    }

    fn run<V: Vehicle>(
        &self,
        kind: DatasetKind,
        vehicle: &V,
        cancel: &CancelToken,
    ) -> Result<RefreshOutcome, RefreshError> {
        // A missing or unreadable prior file is not fatal; the absent
        // sentinel forces the fetch to be treated as changed.
        let old_hash = match fs::read(vehicle.path()) {
            Ok(buf) => ContentHash::of(&buf),
            Err(_) => ContentHash::absent(),
        };

        let fetched = vehicle.read(cancel, &old_hash).map_err(|err| match err {
            VehicleError::Cancelled => RefreshError::Cancelled { kind },
            err => RefreshError::Download { kind, source: err },
        })?;

        if fetched.hash.matches(&old_hash) {
            debug!(%kind, hash = %old_hash, "remote content unchanged, skipping");
            return Ok(RefreshOutcome::Unchanged);
        }

        if fetched.data.is_empty() {
            // Differing hash with no bytes is a transport contract violation
            return Err(RefreshError::EmptyPayload { kind });
        }

        validate(kind, &fetched.data)
            .map_err(|source| RefreshError::InvalidFormat { kind, source })?;

        // Last cancellation point; phase 2 must run to completion
        if cancel.is_cancelled() {
            return Err(RefreshError::Cancelled { kind });
        }

        // The reload hook fires when the guard drops, on the error path too
        let _reload = ReloadOnDrop {
            registry: &self.registry,
            kind,
        };

        // The old instance may hold the file open or memory-mapped, so it
        // must be closed before the bytes are replaced.
        self.registry.release(kind);

        vehicle
            .write(&fetched.data)
            .map_err(|source| RefreshError::Write { kind, source })?;

        info!(%kind, hash = %fetched.hash, bytes = fetched.data.len(), "dataset updated");
        Ok(RefreshOutcome::Updated)
    }
}

#[cfg(feature = "remote-updates")]
impl<R: InstanceRegistry> Updater<R> {
    /// Refresh one dataset kind over HTTP
    ///
    /// `override_path` replaces the configured local path for this call;
    /// `None` means the deterministic default for the kind. The registry's
    /// reload hook always re-reads the configured path, so with an
    /// override the new bytes are persisted to the override file while
    /// the in-memory instance is rebuilt from the default one.
    pub fn refresh(
        &self,
        kind: DatasetKind,
        override_path: Option<&Path>,
    ) -> Result<RefreshOutcome, RefreshError> {
        let path = override_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.path_for(kind));
        let vehicle = HttpVehicle::new(&self.config, kind, path)
            .map_err(|source| RefreshError::Download { kind, source })?;
        debug!(%kind, url = vehicle.url(), path = %vehicle.path().display(), "refreshing dataset over HTTP");
        self.refresh_with_vehicle(kind, &vehicle, &CancelToken::new())
    }

    /// Refresh every dataset kind, collecting per-kind results
    pub fn refresh_all(&self) -> Vec<(DatasetKind, Result<RefreshOutcome, RefreshError>)> {
        DatasetKind::ALL
            .iter()
            .map(|&kind| (kind, self.refresh(kind, None)))
            .collect()
    }
}

/// Guaranteed reload signal for phase 2
struct ReloadOnDrop<'a, R: InstanceRegistry> {
    registry: &'a R,
    kind: DatasetKind,
}

impl<R: InstanceRegistry> Drop for ReloadOnDrop<'_, R> {
    fn drop(&mut self) {
        self.registry.reload(self.kind);
    }
}

/// Errors surfaced by a refresh, each naming the dataset kind and stage
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Network or transport failure; local state untouched, retryable
    #[error("can't download {kind} dataset: {source}")]
    Download {
        /// Dataset being refreshed
        kind: DatasetKind,
        /// Underlying transport error
        source: VehicleError,
    },

    /// Transport returned zero bytes despite a differing hash
    #[error("downloaded {kind} dataset is empty")]
    EmptyPayload {
        /// Dataset being refreshed
        kind: DatasetKind,
    },

    /// Downloaded bytes failed structural validation; local state untouched
    #[error("invalid {kind} dataset: {source}")]
    InvalidFormat {
        /// Dataset being refreshed
        kind: DatasetKind,
        /// Underlying format error
        source: FormatError,
    },

    /// Disk write failed after the old instance was already released
    ///
    /// Degraded state: the kind stays unloaded until the next successful
    /// refresh, so callers should retry promptly.
    #[error("can't save {kind} dataset: {source}")]
    Write {
        /// Dataset being refreshed
        kind: DatasetKind,
        /// Underlying write error
        source: VehicleError,
    },

    /// Caller-initiated abort before the commit phase
    #[error("{kind} dataset refresh cancelled")]
    Cancelled {
        /// Dataset being refreshed
        kind: DatasetKind,
    },

    /// Another refresh for this kind is already in flight
    #[error("another {kind} dataset refresh is already running")]
    InProgress {
        /// Dataset being refreshed
        kind: DatasetKind,
    },
}
