// ==============================================================================
// output.rs - VCF and BSVI Table Output
// ==============================================================================
// Description: Writes the normalized VCF and the decomposed tab-separated table
//              from the same in-memory records
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Every artifact is written to "<name>.partial" and renamed into place after a
// successful flush, so a failed run never leaves a truncated file behind.
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::models::{AnnotatedRecord, VCFRecord, TABLE_COLUMNS};

/// Artifacts this tool can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Normalized VCF, no column header row beyond the original header
    Vcf,
    /// Decomposed table with a header row
    Tsv,
}

impl OutputFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Vcf => "vcf",
            OutputFormat::Tsv => "tsv",
        }
    }
}

/// Serialize one record as a VCF data line (no terminator)
pub fn format_vcf_line(record: &VCFRecord) -> String {
    record.columns().join("\t")
}

/// Writes output artifacts for one run
pub struct OutputGenerator {
    /// Header lines copied verbatim ahead of the records
    header: Vec<String>,
}

impl OutputGenerator {
    pub fn new(header: Vec<String>) -> Self {
        Self { header }
    }

    /// Write the header and records as a VCF
    pub fn write_vcf(&self, path: &Path, records: &[VCFRecord]) -> Result<PathBuf> {
        info!("Writing vcf to outfile: {:?}", path);

        let mut file = AtomicFile::create(path)?;
        {
            let writer = file.writer();
            for line in &self.header {
                writeln!(writer, "{}", line)?;
            }
            for record in records {
                writeln!(writer, "{}", format_vcf_line(record))?;
            }
        }
        file.commit()?;

        info!(
            "VCF output complete: {} header lines, {} records",
            self.header.len(),
            records.len()
        );
        Ok(path.to_path_buf())
    }

    /// Write the decomposed records as a tab-separated table with a header row
    pub fn write_table(&self, path: &Path, records: &[AnnotatedRecord]) -> Result<PathBuf> {
        info!("Writing tsv to outfile: {:?}", path);

        let mut file = AtomicFile::create(path)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(file.writer());

            writer
                .write_record(TABLE_COLUMNS)
                .context("Failed to write table header")?;
            for record in records {
                writer
                    .write_record(record.table_row())
                    .with_context(|| format!("Failed to write table row {}", record.record.locus()))?;
            }
            writer.flush()?;
        }
        file.commit()?;

        info!("TSV output complete: {} rows", records.len());
        Ok(path.to_path_buf())
    }
}

/// Launch a compressor on a finished file without waiting for it
///
/// The child is detached: its exit status is never collected and the process
/// may still be running when this program exits.
pub fn spawn_compression(program: &str, path: &Path) -> Result<()> {
    info!("Compressing {:?} with {} in the background", path, program);

    let child = Command::new(program)
        .arg(path)
        .stdin(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to launch {}", program))?;

    debug!("{} started with pid {}", program, child.id());
    Ok(())
}

/// File written under a temporary sibling name and renamed on commit
struct AtomicFile {
    target: PathBuf,
    partial: PathBuf,
    writer: BufWriter<File>,
    committed: bool,
}

impl AtomicFile {
    fn create(target: &Path) -> Result<Self> {
        let mut partial_name = target
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid output path: {:?}", target))?;
        partial_name.push(".partial");
        let partial = target.with_file_name(partial_name);

        let file = File::create(&partial)
            .with_context(|| format!("Failed to create {:?}", partial))?;

        Ok(Self {
            target: target.to_path_buf(),
            partial,
            writer: BufWriter::new(file),
            committed: false,
        })
    }

    fn writer(&mut self) -> &mut BufWriter<File> {
        &mut self.writer
    }

    fn commit(mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", self.partial))?;
        self.writer.get_ref().sync_all()?;

        std::fs::rename(&self.partial, &self.target)
            .with_context(|| format!("Failed to move {:?} into place", self.target))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.partial) {
            warn!("Failed to remove partial output {:?}: {}", self.partial, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Annotation, CrossReferences};
    use crate::parsers::VCFParser;
    use std::io::Cursor;
    use tempfile::TempDir;

    const VCF: &str = "\
##fileformat=VCFv4.2
##source=Mutect2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tTUMOR
chr1\t100\t.\tA\tT\t.\tPASS\tCSQ=BRCA1|SNV|missense_variant|2/23|c.1A>T|p.M1L|0.01|||COS1\tGT:AD\t0/1:10,5
chr17\t7577120\trs28934576\tC\tT\t60.2\tclustered_events\tDP=40\tGT:AD:AF\t0/1:30,10:0.25
";

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Vcf.extension(), "vcf");
        assert_eq!(OutputFormat::Tsv.extension(), "tsv");
    }

    #[test]
    fn test_vcf_round_trip_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tumor.bsvi.vcf");

        let document = VCFParser::new().parse(Cursor::new(VCF)).unwrap();
        OutputGenerator::new(document.header.clone())
            .write_vcf(&path, &document.records)
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), VCF);
        assert!(!dir.path().join("tumor.bsvi.vcf.partial").exists());
    }

    #[test]
    fn test_write_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tumor.bsvi.tsv");

        let document = VCFParser::new().parse(Cursor::new(VCF)).unwrap();
        let annotated = AnnotatedRecord {
            record: document.records[0].clone(),
            annotation: Annotation {
                gene: "BRCA1".to_string(),
                db: "COS1".to_string(),
                ..Default::default()
            },
            cross_references: CrossReferences {
                cosmic: "COS1".to_string(),
                ..Default::default()
            },
            report_text: "BRCA1 SNV variant in 2/23 \\nc.1A>T".to_string(),
        };

        OutputGenerator::new(document.header)
            .write_table(&path, &[annotated])
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], TABLE_COLUMNS.join("\t"));

        let row: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(row.len(), TABLE_COLUMNS.len());
        assert_eq!(row[0], "chr1");
        assert_eq!(row[8], "0/1:10,5");
        assert_eq!(row[9], "BRCA1");
        assert_eq!(row[18], "COS1");
        assert_eq!(row[21], "BRCA1 SNV variant in 2/23 \\nc.1A>T");
        assert!(!contents.contains("CSQ="));
    }

    #[test]
    fn test_abandoned_write_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tumor.bsvi.vcf");

        {
            let mut file = AtomicFile::create(&target).unwrap();
            writeln!(file.writer(), "##fileformat=VCFv4.2").unwrap();
        }

        assert!(!target.exists());
        assert!(!dir.path().join("tumor.bsvi.vcf.partial").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_compression() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tumor.bsvi.vcf");
        std::fs::write(&path, VCF).unwrap();

        assert!(spawn_compression("true", &path).is_ok());
        assert!(spawn_compression("definitely-not-a-real-gzip", &path).is_err());
    }

    #[test]
    fn test_missing_output_dir() {
        let result = OutputGenerator::new(Vec::new())
            .write_vcf(Path::new("/nonexistent/dir/out.vcf"), &[]);
        assert!(result.is_err());
    }
}
