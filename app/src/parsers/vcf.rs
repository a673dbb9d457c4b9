// ==============================================================================
// parsers/vcf.rs - VCF record stream reader
// ==============================================================================
// Description: Single-pass text reader for single-sample VCF files
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// ==============================================================================
// Format: header lines start with '#', then one tab-delimited record per line
// with exactly 10 columns (CHROM..SAMPLE). Multi-sample files are rejected.
// ==============================================================================

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{VCFRecord, VCF_COLUMNS};

/// Gzip magic number (also matches BGZF)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// VCF parsing errors
#[derive(Error, Debug)]
pub enum VCFParseError {
    #[error("Failed to open VCF file: {0}")]
    FileOpenError(String),

    #[error("Malformed record at line {line}: expected {expected} tab-delimited fields, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid position at line {line}: '{value}'")]
    InvalidPosition { line: usize, value: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Header lines and data records of one VCF stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VcfDocument {
    /// Header lines verbatim, without line terminators
    pub header: Vec<String>,
    pub records: Vec<VCFRecord>,
}

/// VCF reader with configuration options
#[derive(Debug, Clone, Default)]
pub struct VCFParser {
    /// Strip '"' characters wrapping each line (seen on some splitter output)
    pub strip_quotes: bool,
}

impl VCFParser {
    /// Create new VCF parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip surrounding double quotes from every line before parsing
    pub fn with_strip_quotes(mut self, strip: bool) -> Self {
        self.strip_quotes = strip;
        self
    }

    /// Parse a VCF file from disk, decompressing gzip/BGZF input transparently
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<VcfDocument, VCFParseError> {
        let reader = open_path(path)?;
        self.parse(reader)
    }

    /// Parse a VCF stream
    ///
    /// Lines are consumed one at a time; the header/data boundary is decided
    /// purely by the leading '#'. A '#' line after data joins the header.
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<VcfDocument, VCFParseError> {
        let mut document = VcfDocument::default();

        for (idx, line_result) in reader.lines().enumerate() {
            let line_number = idx + 1;
            let raw = line_result?;
            let line = self.clean_line(&raw);

            if line.is_empty() {
                continue;
            }

            if line.starts_with('#') {
                if !document.records.is_empty() {
                    warn!("Header line after data records at line {}", line_number);
                }
                document.header.push(line.to_string());
                continue;
            }

            document.records.push(parse_record(line, line_number)?);
        }

        debug!(
            "Read {} header lines and {} records",
            document.header.len(),
            document.records.len()
        );

        Ok(document)
    }

    fn clean_line<'a>(&self, line: &'a str) -> &'a str {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if self.strip_quotes {
            line.trim_matches('"')
        } else {
            line
        }
    }
}

/// Parse a single data line into a record
pub fn parse_record(line: &str, line_number: usize) -> Result<VCFRecord, VCFParseError> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != VCF_COLUMNS.len() {
        return Err(VCFParseError::MalformedRecord {
            line: line_number,
            expected: VCF_COLUMNS.len(),
            found: fields.len(),
        });
    }

    let invalid_position = || VCFParseError::InvalidPosition {
        line: line_number,
        value: fields[1].to_string(),
    };
    let pos = fields[1].parse::<u64>().map_err(|_| invalid_position())?;

    // Signs and leading zeros would not survive writing the record back
    if pos.to_string() != fields[1] {
        return Err(invalid_position());
    }

    Ok(VCFRecord {
        chrom: fields[0].to_string(),
        pos,
        id: fields[2].to_string(),
        reference: fields[3].to_string(),
        alt: fields[4].to_string(),
        qual: fields[5].to_string(),
        filter: fields[6].to_string(),
        info: fields[7].to_string(),
        format: fields[8].to_string(),
        sample: fields[9].to_string(),
    })
}

/// Open a VCF file, wrapping it in a gzip decoder when the magic number says so
pub fn open_path(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>, VCFParseError> {
    let path = path.as_ref();
    let open = || {
        File::open(path)
            .map_err(|e| VCFParseError::FileOpenError(format!("{}: {}", path.display(), e)))
    };

    if is_gzipped(path)? {
        debug!("Detected gzip input: {:?}", path);
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(open()?))))
    } else {
        Ok(Box::new(BufReader::new(open()?)))
    }
}

/// Check the first two bytes of a file for the gzip magic number
pub fn is_gzipped(path: impl AsRef<Path>) -> Result<bool, VCFParseError> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .map_err(|e| VCFParseError::FileOpenError(format!("{}: {}", path.display(), e)))?;

    let mut magic = [0u8; 2];
    let mut read = 0;
    while read < magic.len() {
        match file.read(&mut magic[read..])? {
            0 => return Ok(false),
            n => read += n,
        }
    }

    Ok(magic == GZIP_MAGIC)
}
