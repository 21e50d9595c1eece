//! Reader for the zip archive returned by the Tesscut `astrocut` endpoint.
//!
//! The archive holds one FITS file per observation window. Only the pieces needed
//! to reach each member are decoded:
//!
//! * the end-of-central-directory record (located by scanning backwards),
//! * the central directory entries (name, method, sizes, local header offset),
//! * the local file header, to find where the member data starts.
//!
//! Members are either *stored* (method 0) or *deflated* (method 8, inflated with
//! `flate2`). ZIP64 archives are rejected; Tesscut never produces them for the
//! tiny cutouts requested here.

use std::io::Read;

use flate2::read::DeflateDecoder;
use nom::{
    bytes::complete::{tag, take},
    number::complete::{le_u16, le_u32},
    IResult, Parser,
};

use crate::tesscope_errors::TesscopeError;

const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const CENTRAL_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const LOCAL_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

const EOCD_LEN: usize = 22;
const LOCAL_HEADER_LEN: usize = 30;
const ZIP64_MARKER: u32 = u32::MAX;
/// Upper bound on the buffer reserved from a header's declared size
const MAX_PREALLOC: usize = 1 << 20;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

#[derive(Debug, PartialEq)]
struct EndOfCentralDirectory {
    entries: u16,
    size: u32,
    offset: u32,
}

/// One central directory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub method: u16,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub local_offset: u32,
}

fn parse_eocd(input: &[u8]) -> IResult<&[u8], EndOfCentralDirectory> {
    let (input, _) = tag(&EOCD_SIGNATURE[..]).parse(input)?;
    let (input, _) = take(6usize).parse(input)?; // disk numbers, entries on this disk
    let (input, entries) = le_u16(input)?;
    let (input, size) = le_u32(input)?;
    let (input, offset) = le_u32(input)?;
    Ok((
        input,
        EndOfCentralDirectory {
            entries,
            size,
            offset,
        },
    ))
}

fn parse_central_entry(input: &[u8]) -> IResult<&[u8], ArchiveEntry> {
    let (input, _) = tag(&CENTRAL_SIGNATURE[..]).parse(input)?;
    let (input, _) = take(6usize).parse(input)?; // versions, flags
    let (input, method) = le_u16(input)?;
    let (input, _) = take(8usize).parse(input)?; // time, date, crc
    let (input, compressed_size) = le_u32(input)?;
    let (input, uncompressed_size) = le_u32(input)?;
    let (input, name_len) = le_u16(input)?;
    let (input, extra_len) = le_u16(input)?;
    let (input, comment_len) = le_u16(input)?;
    let (input, _) = take(8usize).parse(input)?; // disk start, attributes
    let (input, local_offset) = le_u32(input)?;
    let (input, name) = take(name_len as usize).parse(input)?;
    let (input, _) = take(extra_len as usize + comment_len as usize).parse(input)?;
    Ok((
        input,
        ArchiveEntry {
            name: String::from_utf8_lossy(name).into_owned(),
            method,
            compressed_size,
            uncompressed_size,
            local_offset,
        },
    ))
}

/// Length of the variable part of a local header (`name` + `extra`).
fn parse_local_header(input: &[u8]) -> IResult<&[u8], usize> {
    let (input, _) = tag(&LOCAL_SIGNATURE[..]).parse(input)?;
    let (input, _) = take(22usize).parse(input)?;
    let (input, name_len) = le_u16(input)?;
    let (input, extra_len) = le_u16(input)?;
    Ok((input, name_len as usize + extra_len as usize))
}

fn malformed<E: std::fmt::Debug>(what: &str) -> impl FnOnce(E) -> TesscopeError + '_ {
    move |err| TesscopeError::MalformedRecord(format!("cutout archive: {what} ({err:?})"))
}

/// A zip archive held in memory.
pub struct CutoutArchive<'a> {
    bytes: &'a [u8],
    entries: Vec<ArchiveEntry>,
}

impl<'a> CutoutArchive<'a> {
    /// Read the central directory of `bytes`.
    ///
    /// Return
    /// ----------
    /// * The archive, or a [`TesscopeError::MalformedRecord`] when the bytes are
    ///   not a readable zip archive.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, TesscopeError> {
        if bytes.len() < EOCD_LEN {
            return Err(TesscopeError::MalformedRecord(
                "cutout archive: shorter than an end-of-central-directory record".into(),
            ));
        }
        let eocd_start = (0..=bytes.len() - EOCD_LEN)
            .rev()
            .find(|&i| bytes[i..].starts_with(&EOCD_SIGNATURE))
            .ok_or_else(|| {
                TesscopeError::MalformedRecord("cutout archive: no end of central directory".into())
            })?;
        let (_, eocd) =
            parse_eocd(&bytes[eocd_start..]).map_err(malformed("end of central directory"))?;

        if eocd.entries == u16::MAX || eocd.offset == ZIP64_MARKER || eocd.size == ZIP64_MARKER {
            return Err(TesscopeError::MalformedRecord(
                "cutout archive: ZIP64 archives are not supported".into(),
            ));
        }

        let mut directory = bytes.get(eocd.offset as usize..).ok_or_else(|| {
            TesscopeError::MalformedRecord("cutout archive: central directory out of range".into())
        })?;
        let mut entries = Vec::with_capacity(eocd.entries as usize);
        for _ in 0..eocd.entries {
            let (rest, entry) =
                parse_central_entry(directory).map_err(malformed("central directory entry"))?;
            entries.push(entry);
            directory = rest;
        }

        Ok(CutoutArchive { bytes, entries })
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Decompressed content of `entry`.
    pub fn read(&self, entry: &ArchiveEntry) -> Result<Vec<u8>, TesscopeError> {
        if entry.local_offset == ZIP64_MARKER || entry.compressed_size == ZIP64_MARKER {
            return Err(TesscopeError::MalformedRecord(format!(
                "cutout archive: {} uses ZIP64 fields",
                entry.name
            )));
        }
        let local = self.bytes.get(entry.local_offset as usize..).ok_or_else(|| {
            TesscopeError::MalformedRecord(format!("cutout archive: {} out of range", entry.name))
        })?;
        let (_, variable_len) = parse_local_header(local).map_err(malformed("local header"))?;

        let start = LOCAL_HEADER_LEN + variable_len;
        let data = local
            .get(start..start + entry.compressed_size as usize)
            .ok_or_else(|| {
                TesscopeError::MalformedRecord(format!("cutout archive: {} truncated", entry.name))
            })?;

        match entry.method {
            METHOD_STORED => Ok(data.to_vec()),
            METHOD_DEFLATED => {
                let declared = entry.uncompressed_size as usize;
                let mut content = Vec::with_capacity(declared.min(MAX_PREALLOC));
                DeflateDecoder::new(data)
                    .take(u64::from(entry.uncompressed_size))
                    .read_to_end(&mut content)?;
                Ok(content)
            }
            other => Err(TesscopeError::MalformedRecord(format!(
                "cutout archive: {} uses unsupported compression method {other}",
                entry.name
            ))),
        }
    }

    /// Every `.fits` member, sorted by name, with its content.
    pub fn fits_members(&self) -> Result<Vec<(String, Vec<u8>)>, TesscopeError> {
        let mut members: Vec<&ArchiveEntry> = self
            .entries
            .iter()
            .filter(|e| e.name.to_ascii_lowercase().ends_with(".fits"))
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
            .into_iter()
            .map(|entry| Ok((entry.name.clone(), self.read(entry)?)))
            .collect()
    }
}
