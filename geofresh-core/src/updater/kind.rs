// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Dataset kind definitions
//!
//! A [`DatasetKind`] selects the remote endpoint, the deterministic local
//! file name and the format validator that apply to one refreshable
//! dataset.

use serde::{Deserialize, Serialize};

/// The four refreshable dataset categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// IP geolocation database (MaxMind DB format)
    Mmdb,
    /// AS-number database (MaxMind DB format)
    Asn,
    /// IP category list (length-delimited protobuf)
    GeoIp,
    /// Site category list (length-delimited protobuf)
    GeoSite,
}

impl DatasetKind {
    /// All kinds, in refresh order
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Mmdb,
        DatasetKind::Asn,
        DatasetKind::GeoIp,
        DatasetKind::GeoSite,
    ];

    /// Deterministic on-disk file name for this kind
    pub fn file_name(&self) -> &'static str {
        match self {
            DatasetKind::Mmdb => "Country.mmdb",
            DatasetKind::Asn => "ASN.mmdb",
            DatasetKind::GeoIp => "GeoIP.dat",
            DatasetKind::GeoSite => "GeoSite.dat",
        }
    }

    /// True for the MaxMind DB kinds, false for the list kinds
    pub fn is_database(&self) -> bool {
        matches!(self, DatasetKind::Mmdb | DatasetKind::Asn)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            DatasetKind::Mmdb => 0,
            DatasetKind::Asn => 1,
            DatasetKind::GeoIp => 2,
            DatasetKind::GeoSite => 3,
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DatasetKind::Mmdb => "MMDB",
            DatasetKind::Asn => "ASN",
            DatasetKind::GeoIp => "GeoIP",
            DatasetKind::GeoSite => "GeoSite",
        };
        write!(f, "{}", name)
    }
}
