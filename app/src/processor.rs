// ==============================================================================
// processor.rs - Mutect2 to BSVI Pipeline
// ==============================================================================
// Description: Drives one run: read (optionally through the splitter),
//              normalize genotypes, decompose annotations, write artifacts
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Stages run strictly in order, each on a fresh record set:
//   Start -> Normalized -> [Decomposed] -> Written -> Done
// Any error aborts the run. Nothing is retried.
// ==============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::annotation::AnnotationDecomposer;
use crate::audit::{compute_sha256, AuditEventType, AuditTrail};
use crate::config::PipelineConfig;
use crate::genotype_normalizer::normalize_records;
use crate::output::{spawn_compression, OutputFormat, OutputGenerator};
use crate::parsers::VCFParser;
use crate::splitter::{BcftoolsNorm, FileSource, RecordSource};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    Normalized,
    Decomposed,
    Written,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Start => "start",
            PipelineStage::Normalized => "normalized",
            PipelineStage::Decomposed => "decomposed",
            PipelineStage::Written => "written",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub vcf_path: PathBuf,
    pub tsv_path: Option<PathBuf>,
    pub records: usize,
    pub genotypes_rewritten: usize,
}

pub struct BsviProcessor {
    config: PipelineConfig,
    audit: AuditTrail,
    stage: PipelineStage,
}

impl BsviProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        let audit = AuditTrail::new(config.audit_log.clone());
        Self {
            config,
            audit,
            stage: PipelineStage::Start,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Run the whole pipeline
    ///
    /// On failure the stage reached is logged and recorded in the audit trail
    /// before the error is returned.
    pub fn run(&mut self) -> Result<PipelineOutcome> {
        self.audit.log_event(
            AuditEventType::RunStarted,
            Some(self.config.input_path.display().to_string()),
            serde_json::to_value(&self.config)?,
        );

        match self.execute() {
            Ok(outcome) => {
                self.audit.log_event(
                    AuditEventType::RunCompleted,
                    Some(outcome.vcf_path.display().to_string()),
                    serde_json::to_value(&outcome)?,
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!("Run failed after stage '{}': {:#}", self.stage, e);
                self.audit.log_event(
                    AuditEventType::RunFailed,
                    Some(self.config.input_path.display().to_string()),
                    serde_json::json!({
                        "stage": self.stage,
                        "error": format!("{:#}", e),
                    }),
                );
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<PipelineOutcome> {
        info!("Processing {:?}", self.config.input_path);

        let vcf_path = self.config.vcf_output_path();
        let tsv_path = self
            .config
            .emit_derived_table
            .then(|| self.config.tsv_output_path());
        self.check_output_paths(&vcf_path, tsv_path.as_deref())?;

        // Read
        let source = self.record_source();
        let parser = VCFParser::new().with_strip_quotes(self.config.split_multiallelics);
        let document = source
            .read_document(&parser)
            .with_context(|| format!("Failed to read records from {}", source.describe()))?;
        info!(
            "Read {} header lines and {} records",
            document.header.len(),
            document.records.len()
        );

        // Normalize
        let normalized =
            normalize_records(&document.records).context("Genotype normalization failed")?;
        self.advance(
            PipelineStage::Normalized,
            serde_json::json!({
                "records": normalized.records.len(),
                "genotypes_rewritten": normalized.rewritten,
            }),
        );

        // Decompose
        let annotated = if self.config.emit_derived_table {
            let decomposer = AnnotationDecomposer::new()
                .with_key(self.config.annotation_key.clone())
                .with_report_policy(self.config.report_text_policy)
                .with_cross_reference_policy(self.config.cross_reference_policy);
            let annotated = decomposer
                .decompose_all(&normalized.records)
                .context("Annotation decomposition failed")?;
            self.advance(
                PipelineStage::Decomposed,
                serde_json::json!({ "records": annotated.len() }),
            );
            Some(annotated)
        } else {
            None
        };

        // Write
        let generator = OutputGenerator::new(document.header);
        generator
            .write_vcf(&vcf_path, &normalized.records)
            .context("Failed to write VCF output")?;
        self.record_artifact(OutputFormat::Vcf, &vcf_path, normalized.records.len())?;

        if let (Some(path), Some(rows)) = (&tsv_path, &annotated) {
            generator
                .write_table(path, rows)
                .context("Failed to write TSV output")?;
            self.record_artifact(OutputFormat::Tsv, path, rows.len())?;
        }
        self.advance(PipelineStage::Written, serde_json::json!({}));

        if let Some(compressor) = &self.config.compress_with {
            spawn_compression(compressor, &vcf_path)?;
            self.audit.log_event(
                AuditEventType::CompressionLaunched,
                Some(vcf_path.display().to_string()),
                serde_json::json!({ "program": compressor }),
            );
        }

        self.advance(PipelineStage::Done, serde_json::json!({}));

        Ok(PipelineOutcome {
            vcf_path,
            tsv_path,
            records: normalized.records.len(),
            genotypes_rewritten: normalized.rewritten,
        })
    }

    fn record_source(&self) -> Box<dyn RecordSource> {
        if self.config.split_multiallelics {
            Box::new(
                BcftoolsNorm::new(&self.config.input_path)
                    .with_program(self.config.splitter_program.clone())
                    .with_reference(self.config.reference_path.clone()),
            )
        } else {
            Box::new(FileSource::new(&self.config.input_path))
        }
    }

    fn check_output_paths(&self, vcf_path: &Path, tsv_path: Option<&Path>) -> Result<()> {
        let input = &self.config.input_path;
        for output in std::iter::once(vcf_path).chain(tsv_path) {
            if same_file(input, output) {
                anyhow::bail!("Output {:?} would overwrite the input file", output);
            }
        }
        Ok(())
    }

    fn advance(&mut self, stage: PipelineStage, details: serde_json::Value) {
        info!("Stage complete: {}", stage);
        self.stage = stage;
        self.audit.log_event(
            AuditEventType::StageCompleted,
            Some(stage.to_string()),
            details,
        );
    }

    fn record_artifact(&self, format: OutputFormat, path: &Path, rows: usize) -> Result<()> {
        let sha256 = compute_sha256(path)?;
        self.audit.log_event(
            AuditEventType::ArtifactWritten,
            Some(path.display().to_string()),
            serde_json::json!({
                "format": format,
                "rows": rows,
                "sha256": sha256,
            }),
        );
        Ok(())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
