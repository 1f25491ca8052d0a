//! Structural format validation for downloaded payloads
//!
//! A corrupt or truncated download must never replace a good cache entry,
//! so every payload is parsed far enough to guarantee it is loadable before
//! the commit phase starts. Nothing here retains the buffer or keeps any
//! resource open past the call.
//!
//! MMDB kinds are checked by locating the metadata marker, decoding the
//! metadata map and bounds-checking the search tree against the file.
//! List kinds are tokenized as length-delimited protobuf: a sequence of
//! field-1 entries whose bodies must themselves scan as well-formed fields.

use thiserror::Error;

use super::kind::DatasetKind;

/// MMDB metadata marker: "\xAB\xCD\xEFMaxMind.com"
const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Metadata must start within this many bytes of the end of the file
const METADATA_WINDOW: usize = 128 * 1024;

/// Bytes separating the search tree from the data section
const DATA_SECTION_SEPARATOR: u64 = 16;

// MMDB data type tags (after extended-type resolution)
const TYPE_POINTER: usize = 1;
const TYPE_STRING: usize = 2;
const TYPE_UINT16: usize = 5;
const TYPE_UINT32: usize = 6;
const TYPE_MAP: usize = 7;
const TYPE_UINT64: usize = 9;
const TYPE_ARRAY: usize = 11;
const TYPE_BOOL: usize = 14;

/// Summary of an MMDB metadata section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmdbMetadata {
    /// Number of nodes in the search tree
    pub node_count: u32,
    /// Record size in bits (24, 28 or 32)
    pub record_size: u16,
    /// IP version the tree covers (4 or 6)
    pub ip_version: u16,
    /// Major binary format version (must be 2)
    pub binary_format_major_version: u16,
    /// Database type string, e.g. "GeoLite2-Country"
    pub database_type: String,
}

/// Validate a dataset payload for its kind
pub fn validate(kind: DatasetKind, data: &[u8]) -> Result<(), FormatError> {
    if kind.is_database() {
        parse_mmdb_metadata(data).map(|_| ())
    } else {
        parse_list_entries(data).map(|_| ())
    }
}

/// Parse and structurally check an MMDB buffer, returning its metadata
pub fn parse_mmdb_metadata(data: &[u8]) -> Result<MmdbMetadata, FormatError> {
    let marker_at = find_marker(data).ok_or(FormatError::MetadataMissing)?;
    let mut decoder = Decoder::new(&data[marker_at + METADATA_MARKER.len()..]);

    let (ty, count) = decoder.control()?;
    if ty != TYPE_MAP {
        return Err(FormatError::Metadata("metadata section is not a map".into()));
    }

    let mut node_count: Option<u32> = None;
    let mut record_size: Option<u16> = None;
    let mut ip_version: Option<u16> = None;
    let mut major_version: Option<u16> = None;
    let mut database_type: Option<String> = None;

    for _ in 0..count {
        let key = decoder.string()?;
        match key {
            "node_count" => node_count = Some(decoder.uint()? as u32),
            "record_size" => record_size = Some(decoder.uint()? as u16),
            "ip_version" => ip_version = Some(decoder.uint()? as u16),
            "binary_format_major_version" => major_version = Some(decoder.uint()? as u16),
            "database_type" => database_type = Some(decoder.string()?.to_string()),
            _ => decoder.skip()?,
        }
    }

    let metadata = MmdbMetadata {
        node_count: node_count.ok_or(FormatError::MissingField("node_count"))?,
        record_size: record_size.ok_or(FormatError::MissingField("record_size"))?,
        ip_version: ip_version.ok_or(FormatError::MissingField("ip_version"))?,
        binary_format_major_version: major_version
            .ok_or(FormatError::MissingField("binary_format_major_version"))?,
        database_type: database_type.ok_or(FormatError::MissingField("database_type"))?,
    };

    if metadata.binary_format_major_version != 2 {
        return Err(FormatError::UnsupportedVersion(
            metadata.binary_format_major_version,
        ));
    }
    if !matches!(metadata.record_size, 24 | 28 | 32) {
        return Err(FormatError::InvalidRecordSize(metadata.record_size));
    }
    if metadata.node_count == 0 {
        return Err(FormatError::Metadata("empty search tree".into()));
    }

    // Two records per node, record_size bits each
    let tree_size = u64::from(metadata.node_count) * u64::from(metadata.record_size) / 4;
    if tree_size + DATA_SECTION_SEPARATOR > marker_at as u64 {
        return Err(FormatError::TreeOutOfBounds);
    }

    Ok(metadata)
}

/// Locate the last metadata marker within the trailing window
fn find_marker(data: &[u8]) -> Option<usize> {
    let start = data.len().saturating_sub(METADATA_WINDOW);
    let window = &data[start..];
    window
        .windows(METADATA_MARKER.len())
        .rposition(|w| w == METADATA_MARKER)
        .map(|rel| start + rel)
}

/// Tokenize a length-delimited protobuf list, returning the entry count
///
/// The top level must be a sequence of field-1 length-delimited entries
/// (`repeated Entry entry = 1`); every entry body must scan as well-formed
/// tag/wire-type fields with in-bounds lengths.
pub fn parse_list_entries(data: &[u8]) -> Result<usize, FormatError> {
    let mut pos = 0;
    let mut entries = 0;
    while pos < data.len() {
        let (tag, after_tag) = read_varint(data, pos)?;
        if tag >> 3 != 1 || tag & 7 != 2 {
            return Err(FormatError::MalformedEntry(pos));
        }
        let (len, body) = read_varint(data, after_tag)?;
        let len = usize::try_from(len).map_err(|_| FormatError::MalformedEntry(pos))?;
        let end = body
            .checked_add(len)
            .filter(|e| *e <= data.len())
            .ok_or(FormatError::Truncated(after_tag))?;
        scan_fields(data, body, end)?;
        pos = end;
        entries += 1;
    }
    Ok(entries)
}

/// Scan one message body for well-formed fields
fn scan_fields(data: &[u8], start: usize, end: usize) -> Result<(), FormatError> {
    let mut pos = start;
    while pos < end {
        let (tag, next) = read_varint(data, pos)?;
        if tag >> 3 == 0 {
            return Err(FormatError::MalformedEntry(pos));
        }
        pos = match tag & 7 {
            0 => read_varint(data, next)?.1,
            1 => next + 8,
            2 => {
                let (len, body) = read_varint(data, next)?;
                let len = usize::try_from(len).map_err(|_| FormatError::MalformedEntry(pos))?;
                body.checked_add(len).ok_or(FormatError::Truncated(next))?
            }
            5 => next + 4,
            _ => return Err(FormatError::MalformedEntry(pos)),
        };
        if pos > end {
            return Err(FormatError::Truncated(pos));
        }
    }
    Ok(())
}

/// Read a varint at `pos`, returning the value and the following offset
fn read_varint(data: &[u8], pos: usize) -> Result<(u64, usize), FormatError> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().skip(pos).take(10).enumerate() {
        if i == 9 && byte > 1 {
            return Err(FormatError::BadVarint(pos));
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, pos + i + 1));
        }
    }
    // Fewer than 10 bytes remained and every one had its continuation bit set
    Err(FormatError::Truncated(data.len()))
}

/// Minimal decoder for the MMDB metadata data format
struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, pos: 0 }
    }

    fn byte(&mut self) -> Result<u8, FormatError> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or(FormatError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|e| *e <= self.buf.len())
            .ok_or(FormatError::Truncated(self.pos))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a control byte, returning (type, size)
    ///
    /// Pointers are returned with their raw size bits; the metadata
    /// section is not allowed to contain them, callers reject them.
    fn control(&mut self) -> Result<(usize, usize), FormatError> {
        let c = self.byte()?;
        let mut ty = (c >> 5) as usize;
        let raw = (c & 0x1F) as usize;
        if ty == 0 {
            ty = self.byte()? as usize + 7;
        }
        if ty == TYPE_POINTER {
            return Ok((ty, raw));
        }
        let size = match raw {
            29 => 29 + self.byte()? as usize,
            30 => {
                let b = self.take(2)?;
                285 + ((b[0] as usize) << 8 | b[1] as usize)
            }
            31 => {
                let b = self.take(3)?;
                65_821 + ((b[0] as usize) << 16 | (b[1] as usize) << 8 | b[2] as usize)
            }
            s => s,
        };
        Ok((ty, size))
    }

    fn string(&mut self) -> Result<&'a str, FormatError> {
        let (ty, size) = self.control()?;
        if ty != TYPE_STRING {
            return Err(FormatError::Metadata(format!(
                "expected string, found type {}",
                ty
            )));
        }
        std::str::from_utf8(self.take(size)?)
            .map_err(|_| FormatError::Metadata("invalid UTF-8 in metadata".into()))
    }

    fn uint(&mut self) -> Result<u64, FormatError> {
        let (ty, size) = self.control()?;
        if !matches!(ty, TYPE_UINT16 | TYPE_UINT32 | TYPE_UINT64) || size > 8 {
            return Err(FormatError::Metadata(format!(
                "expected unsigned integer, found type {} size {}",
                ty, size
            )));
        }
        let mut value: u64 = 0;
        for &b in self.take(size)? {
            value = value << 8 | u64::from(b);
        }
        Ok(value)
    }

    /// Skip one value of any type
    fn skip(&mut self) -> Result<(), FormatError> {
        let (ty, size) = self.control()?;
        match ty {
            TYPE_POINTER => Err(FormatError::Metadata("pointer in metadata".into())),
            TYPE_MAP => {
                for _ in 0..size {
                    let (kty, ksize) = self.control()?;
                    if kty != TYPE_STRING {
                        return Err(FormatError::Metadata("non-string map key".into()));
                    }
                    self.take(ksize)?;
                    self.skip()?;
                }
                Ok(())
            }
            TYPE_ARRAY => {
                for _ in 0..size {
                    self.skip()?;
                }
                Ok(())
            }
            // Booleans store their value in the size bits, no payload
            TYPE_BOOL => Ok(()),
            _ => self.take(size).map(|_| ()),
        }
    }
}

/// Errors produced by format validation
#[derive(Debug, Error)]
pub enum FormatError {
    /// MMDB metadata marker not found in the trailing window
    #[error("MMDB metadata marker not found")]
    MetadataMissing,

    /// Unexpected end of data
    #[error("unexpected end of data at offset {0}")]
    Truncated(usize),

    /// Metadata section is structurally malformed
    #[error("malformed metadata: {0}")]
    Metadata(String),

    /// A required metadata field is missing
    #[error("missing metadata field {0}")]
    MissingField(&'static str),

    /// Unsupported MMDB binary format major version
    #[error("unsupported binary format version {0}")]
    UnsupportedVersion(u16),

    /// Record size outside {24, 28, 32}
    #[error("invalid record size {0} bits")]
    InvalidRecordSize(u16),

    /// Search tree does not fit before the metadata section
    #[error("search tree does not fit the file")]
    TreeOutOfBounds,

    /// List entry with an unexpected tag or wire type
    #[error("malformed list entry at offset {0}")]
    MalformedEntry(usize),

    /// Varint longer than 10 bytes or overflowing 64 bits
    #[error("malformed varint at offset {0}")]
    BadVarint(usize),
}
