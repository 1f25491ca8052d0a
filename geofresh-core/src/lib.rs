// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Geofresh Core Library
//!
//! Keeps versioned binary geo datasets (MaxMind databases, GeoIP/GeoSite
//! lists) fresh on disk and hot-reloaded in memory. Downloads are skipped
//! when the remote content hash matches the local file, payloads are
//! structurally validated before they ever replace a good cache entry, and
//! on-disk replacement is atomic.

pub mod updater;

pub use updater::{
    parse_list_entries, parse_mmdb_metadata, validate, CancelToken, ContentHash, DatasetInstance,
    DatasetKind, FetchResult, FormatError, HttpVehicle, InstanceDetail, InstanceRegistry,
    MmdbMetadata, RefreshConfig, RefreshError, RefreshOutcome, SharedRegistry, Updater, Vehicle,
    VehicleError,
};
