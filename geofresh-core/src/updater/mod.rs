// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Conditional refresh pipeline for geo datasets
//!
//! Provides functionality for fetching, validating and hot-reloading the
//! four refreshable dataset kinds:
//! - IP geolocation database (MMDB)
//! - AS-number database (MMDB)
//! - GeoIP category list
//! - GeoSite category list
//!
//! Downloads are keyed on a SHA-256 content hash so unchanged remote
//! content is never re-committed, and a downloaded payload must pass a
//! structural format check before it replaces the on-disk copy or the
//! in-memory instance.

mod config;
mod hash;
mod kind;
mod refresh;
mod registry;
mod validate;
mod vehicle;

pub use config::RefreshConfig;
pub use hash::ContentHash;
pub use kind::DatasetKind;
pub use refresh::{RefreshError, RefreshOutcome, Updater};
pub use registry::{DatasetInstance, InstanceDetail, InstanceRegistry, SharedRegistry};
pub use validate::{parse_list_entries, parse_mmdb_metadata, validate, FormatError, MmdbMetadata};
pub use vehicle::{CancelToken, FetchResult, HttpVehicle, Vehicle, VehicleError};
