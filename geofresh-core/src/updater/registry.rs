// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Holders of the currently loaded dataset instances
//!
//! The sequencer never touches a loaded instance directly; it only drives
//! the [`InstanceRegistry`] contract: release the old instance before the
//! file is overwritten, then reload from disk afterwards. [`SharedRegistry`]
//! is the process-wide default implementation other subsystems query for
//! lookups.

use std::fs;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use super::config::RefreshConfig;
use super::hash::ContentHash;
use super::kind::DatasetKind;
use super::validate::{parse_list_entries, parse_mmdb_metadata, FormatError, MmdbMetadata};

/// Contract between the sequencer and whoever holds loaded instances
pub trait InstanceRegistry {
    /// Close the currently loaded instance for a kind, releasing its
    /// underlying resource before the on-disk file is replaced
    fn release(&self, kind: DatasetKind);

    /// Rebuild the instance for a kind from the on-disk file
    ///
    /// Idempotent; failures must not propagate to the sequencer. A kind
    /// whose file is missing or unparsable is left unloaded.
    fn reload(&self, kind: DatasetKind);
}

impl<R: InstanceRegistry + ?Sized> InstanceRegistry for Arc<R> {
    fn release(&self, kind: DatasetKind) {
        (**self).release(kind)
    }

    fn reload(&self, kind: DatasetKind) {
        (**self).reload(kind)
    }
}

/// Parsed, queryable form of one dataset
#[derive(Debug, Clone)]
pub struct DatasetInstance {
    /// Which dataset this instance was loaded from
    pub kind: DatasetKind,
    /// Content hash of the bytes the instance was parsed from
    pub hash: ContentHash,
    /// Kind-specific parse summary
    pub detail: InstanceDetail,
}

/// Kind-specific portion of a loaded instance
#[derive(Debug, Clone)]
pub enum InstanceDetail {
    /// MaxMind database metadata
    Database(MmdbMetadata),
    /// Category list with its entry count
    List {
        /// Number of top-level entries
        entries: usize,
    },
}

impl DatasetInstance {
    /// Parse raw dataset bytes into an instance
    pub fn parse(kind: DatasetKind, data: &[u8]) -> Result<Self, FormatError> {
        let detail = if kind.is_database() {
            InstanceDetail::Database(parse_mmdb_metadata(data)?)
        } else {
            InstanceDetail::List {
                entries: parse_list_entries(data)?,
            }
        };
        Ok(DatasetInstance {
            kind,
            hash: ContentHash::of(data),
            detail,
        })
    }
}

/// Process-wide holder of the active instance per dataset kind
pub struct SharedRegistry {
    config: RefreshConfig,
    slots: [RwLock<Option<Arc<DatasetInstance>>>; 4],
}

impl SharedRegistry {
    /// Create an empty registry bound to the configured dataset paths
    pub fn new(config: RefreshConfig) -> Self {
        SharedRegistry {
            config,
            slots: Default::default(),
        }
    }

    /// Currently loaded instance for a kind, if any
    pub fn current(&self, kind: DatasetKind) -> Option<Arc<DatasetInstance>> {
        self.slots[kind.index()]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Prime every slot from disk at startup
    pub fn load_all(&self) {
        for kind in DatasetKind::ALL {
            self.reload(kind);
        }
    }
}

impl InstanceRegistry for SharedRegistry {
    fn release(&self, kind: DatasetKind) {
        // Dropping the Arc closes the instance once readers are done
        *self.slots[kind.index()]
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn reload(&self, kind: DatasetKind) {
        let path = self.config.path_for(kind);
        let loaded = match fs::read(&path) {
            Ok(data) => match DatasetInstance::parse(kind, &data) {
                Ok(instance) => Some(Arc::new(instance)),
                Err(err) => {
                    warn!(%kind, path = %path.display(), %err, "dataset failed to parse on reload");
                    None
                }
            },
            Err(err) => {
                warn!(%kind, path = %path.display(), %err, "dataset file unreadable on reload");
                None
            }
        };
        *self.slots[kind.index()]
            .write()
            .unwrap_or_else(PoisonError::into_inner) = loaded;
    }
}
