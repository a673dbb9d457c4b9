// ==============================================================================
// splitter.rs - Record Sources (plain file or bcftools norm)
// ==============================================================================
// Description: Typed boundary to the external multiallelic splitter. Every
//              source hands back a parsed document, so the reader's column
//              checks run on whatever the collaborator produced.
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Splitter invocation:
//   bcftools norm -m -both [-f <reference.fa>] <input.vcf[.gz]>
// stdout is read to EOF before the exit status is collected. A non-zero exit
// is reported as a collaborator failure even when the output also failed to
// parse.
// ==============================================================================

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parsers::{VCFParseError, VCFParser, VcfDocument};

/// Default splitter executable
pub const DEFAULT_SPLITTER: &str = "bcftools";

/// Errors raised at the record source boundary
#[derive(Error, Debug)]
pub enum SplitterError {
    #[error("Failed to start {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with {status}")]
    CollaboratorFailure {
        tool: String,
        status: ExitStatus,
        /// Parse error hit on the partial output, if any
        #[source]
        output_error: Option<VCFParseError>,
    },

    #[error("{tool} produced no output stream")]
    MissingOutput { tool: String },

    #[error(transparent)]
    Parse(#[from] VCFParseError),
}

/// Anything that yields a single-sample VCF with one ALT per record
pub trait RecordSource {
    /// Short label used in logs and the audit trail
    fn describe(&self) -> String;

    /// Read and validate the whole stream
    fn read_document(&self, parser: &VCFParser) -> Result<VcfDocument, SplitterError>;
}

/// Input that is already split; read straight from disk
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn read_document(&self, parser: &VCFParser) -> Result<VcfDocument, SplitterError> {
        info!("Reading VCF: {:?}", self.path);
        Ok(parser.parse_path(&self.path)?)
    }
}

/// `bcftools norm -m -both` as a record source
#[derive(Debug, Clone)]
pub struct BcftoolsNorm {
    /// Executable name or path
    pub program: String,
    pub input: PathBuf,
    /// Reference FASTA, passed as `-f` when present
    pub reference: Option<PathBuf>,
}

impl BcftoolsNorm {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_SPLITTER.to_string(),
            input: input.into(),
            reference: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_reference(mut self, reference: Option<PathBuf>) -> Self {
        self.reference = reference;
        self
    }

    /// Arguments after the program name
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["norm".to_string(), "-m".to_string(), "-both".to_string()];
        if let Some(reference) = &self.reference {
            args.push("-f".to_string());
            args.push(path_arg(reference));
        }
        args.push(path_arg(&self.input));
        args
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl RecordSource for BcftoolsNorm {
    fn describe(&self) -> String {
        format!("{} {}", self.program, self.args().join(" "))
    }

    fn read_document(&self, parser: &VCFParser) -> Result<VcfDocument, SplitterError> {
        info!("Calling {} to split multiallelic sites", self.program);
        debug!("Command: {}", self.describe());

        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SplitterError::SpawnFailed {
                tool: self.program.clone(),
                source,
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| SplitterError::MissingOutput {
            tool: self.program.clone(),
        })?;

        let parsed = parser.parse(BufReader::new(&mut stdout));

        if parsed.is_err() {
            // Drain the rest so the child runs to completion and reports its real status
            if let Err(e) = io::copy(&mut stdout, &mut io::sink()) {
                debug!("Failed to drain {} output: {}", self.program, e);
            }
        }
        drop(stdout);

        let status = child.wait().map_err(|source| SplitterError::SpawnFailed {
            tool: self.program.clone(),
            source,
        })?;

        if !status.success() {
            if let Err(e) = &parsed {
                warn!("{} output was unreadable: {}", self.program, e);
            }
            return Err(SplitterError::CollaboratorFailure {
                tool: self.program.clone(),
                status,
                output_error: parsed.err(),
            });
        }

        Ok(parsed?)
    }
}
