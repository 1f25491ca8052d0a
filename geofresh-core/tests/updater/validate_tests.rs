// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for structural format validation

use geofresh_core::{
    parse_list_entries, parse_mmdb_metadata, validate, DatasetKind, FormatError,
};

use crate::{minimal_list, minimal_mmdb, MmdbFixture};

#[test]
fn test_minimal_mmdb_parses() {
    let metadata = parse_mmdb_metadata(&minimal_mmdb()).unwrap();
    assert_eq!(metadata.node_count, 1);
    assert_eq!(metadata.record_size, 24);
    assert_eq!(metadata.ip_version, 6);
    assert_eq!(metadata.binary_format_major_version, 2);
    assert_eq!(metadata.database_type, "Test-Country");
}

#[test]
fn test_all_record_sizes_accepted() {
    for bits in [24, 28, 32] {
        let payload = MmdbFixture {
            record_size: bits,
            ..MmdbFixture::default()
        }
        .build();
        assert_eq!(parse_mmdb_metadata(&payload).unwrap().record_size, bits);
    }
}

#[test]
fn test_unknown_record_size_rejected() {
    let payload = MmdbFixture {
        record_size: 20,
        ..MmdbFixture::default()
    }
    .build();
    assert!(matches!(
        parse_mmdb_metadata(&payload),
        Err(FormatError::InvalidRecordSize(20))
    ));
}

#[test]
fn test_unsupported_major_version_rejected() {
    let payload = MmdbFixture {
        major_version: 3,
        ..MmdbFixture::default()
    }
    .build();
    assert!(matches!(
        parse_mmdb_metadata(&payload),
        Err(FormatError::UnsupportedVersion(3))
    ));
}

#[test]
fn test_oversized_tree_rejected() {
    // Declares far more nodes than the bytes before the marker can hold
    let payload = MmdbFixture {
        node_count: 65_536,
        ..MmdbFixture::default()
    }
    .build();
    assert!(matches!(
        parse_mmdb_metadata(&payload),
        Err(FormatError::TreeOutOfBounds)
    ));
}

#[test]
fn test_truncated_metadata_rejected() {
    let mut payload = minimal_mmdb();
    payload.truncate(payload.len() - 4);
    assert!(parse_mmdb_metadata(&payload).is_err());
}

#[test]
fn test_validate_dispatches_by_kind() {
    assert!(validate(DatasetKind::Mmdb, &minimal_mmdb()).is_ok());
    assert!(validate(DatasetKind::Asn, &minimal_mmdb()).is_ok());
    assert!(validate(DatasetKind::GeoIp, &minimal_list()).is_ok());
    assert!(validate(DatasetKind::GeoSite, &minimal_list()).is_ok());

    // A list is not a database and vice versa
    assert!(validate(DatasetKind::Mmdb, &minimal_list()).is_err());
    assert!(validate(DatasetKind::GeoIp, &minimal_mmdb()).is_err());
}

#[test]
fn test_list_with_mixed_field_types_parses() {
    // entry { country_code: "CN", reverse_match(varint): 300, two entries }
    let data = [
        0x0A, 0x07, 0x0A, 0x02, b'C', b'N', 0x18, 0xAC, 0x02, // entry 1
        0x0A, 0x04, 0x0A, 0x02, b'U', b'S', // entry 2
    ];
    assert_eq!(parse_list_entries(&data).unwrap(), 2);
}

#[test]
fn test_list_entry_with_bad_inner_wire_type_rejected() {
    // inner field with reserved wire type 7
    let data = [0x0A, 0x01, 0x0F];
    assert!(matches!(
        parse_list_entries(&data),
        Err(FormatError::MalformedEntry(_))
    ));
}
