// ==============================================================================
// validator.rs - Input and Environment Validation
// ==============================================================================
// Description: Checks required external tools and the shape of the input VCF
//              and reference FASTA before any processing starts
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Pre-execution failures
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("Required tool '{0}' is not installed or not on PATH")]
    ToolNotAvailable(String),

    #[error("Invalid argument: {0}")]
    ArgumentError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Locate an executable on PATH (or accept an explicit path)
pub fn require_tool(tool: &str) -> Result<PathBuf, EnvironmentError> {
    let path = which::which(tool).map_err(|_| EnvironmentError::ToolNotAvailable(tool.to_string()))?;
    debug!("Found {} at {:?}", tool, path);
    Ok(path)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub extension: String,
    pub size: u64,
    pub compressed: bool,
}

pub struct FileValidator {
    /// Extension -> expected magic number (empty for plain text)
    allowed_inputs: HashMap<String, Vec<u8>>,
    reference_extensions: Vec<String>,
}

impl FileValidator {
    pub fn new() -> Self {
        let mut allowed_inputs = HashMap::new();

        // Plain text VCF
        allowed_inputs.insert("vcf".to_string(), vec![]);

        // Gzip/BGZF compressed VCF
        allowed_inputs.insert("vcf.gz".to_string(), vec![0x1f, 0x8b]);

        let reference_extensions = ["fa", "fasta", "fna", "fa.gz", "fasta.gz", "fna.gz"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        Self {
            allowed_inputs,
            reference_extensions,
        }
    }

    /// Validate the VCF passed on the command line
    pub fn validate_input(&self, path: &Path) -> Result<ValidatedFile, EnvironmentError> {
        let size = self.require_file(path, "input VCF")?;

        let file_name = self.file_name(path)?;
        let ext = self.get_extension(&file_name).ok_or_else(|| {
            EnvironmentError::ArgumentError(format!(
                "input must be a .vcf or .vcf.gz file: {}",
                path.display()
            ))
        })?;

        let expected_magic = self.allowed_inputs.get(&ext).ok_or_else(|| {
            EnvironmentError::ArgumentError(format!(
                "input must be a .vcf or .vcf.gz file: {}",
                path.display()
            ))
        })?;

        if !expected_magic.is_empty() {
            let actual_magic = self.read_magic_number(path)?;
            if !self.verify_magic_number(expected_magic, &actual_magic) {
                return Err(EnvironmentError::ArgumentError(format!(
                    "{} has a .gz extension but is not gzip compressed",
                    path.display()
                )));
            }
            debug!("Magic number check passed");
        }

        info!("Validated input VCF: {} ({} bytes)", file_name, size);

        Ok(ValidatedFile {
            path: path.to_path_buf(),
            compressed: !expected_magic.is_empty(),
            extension: ext,
            size,
        })
    }

    /// Validate the reference FASTA handed to the splitter
    pub fn validate_reference(&self, path: &Path) -> Result<ValidatedFile, EnvironmentError> {
        let size = self.require_file(path, "reference FASTA")?;
        let file_name = self.file_name(path)?.to_lowercase();

        let ext = self
            .reference_extensions
            .iter()
            .find(|ext| file_name.ends_with(&format!(".{}", ext)))
            .cloned()
            .ok_or_else(|| {
                EnvironmentError::ArgumentError(format!(
                    "reference must be a FASTA file (.fa, .fasta, .fna): {}",
                    path.display()
                ))
            })?;

        info!("Validated reference FASTA: {} ({} bytes)", file_name, size);

        Ok(ValidatedFile {
            path: path.to_path_buf(),
            compressed: ext.ends_with(".gz"),
            extension: ext,
            size,
        })
    }

    fn require_file(&self, path: &Path, what: &str) -> Result<u64, EnvironmentError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            EnvironmentError::ArgumentError(format!("{} {}: {}", what, path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(EnvironmentError::ArgumentError(format!(
                "{} is not a regular file: {}",
                what,
                path.display()
            )));
        }

        Ok(metadata.len())
    }

    fn file_name(&self, path: &Path) -> Result<String, EnvironmentError> {
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| EnvironmentError::ArgumentError(format!("Invalid file path: {}", path.display())))
    }

    fn get_extension(&self, filename: &str) -> Option<String> {
        let lower = filename.to_lowercase();
        // Handle compound extensions like .vcf.gz
        if lower.ends_with(".vcf.gz") {
            Some("vcf.gz".to_string())
        } else if lower.ends_with(".vcf") {
            Some("vcf".to_string())
        } else {
            None
        }
    }

    fn read_magic_number(&self, path: &Path) -> Result<Vec<u8>, EnvironmentError> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::with_capacity(4);
        file.by_ref().take(4).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn verify_magic_number(&self, expected: &[u8], actual: &[u8]) -> bool {
        expected.len() <= actual.len()
            && expected.iter().zip(actual.iter()).all(|(e, a)| e == a)
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}
