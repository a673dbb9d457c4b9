// ==============================================================================
// main.rs - Mutect2 BSVI Converter Entry Point
// ==============================================================================
// Description: Command line entry point converting an annotated Mutect2 VCF
//              into BSVI-ready VCF and TSV files
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mutect2_bsvi::config::{PipelineConfig, DEFAULT_COMPRESSOR};
use mutect2_bsvi::models::{CrossReferencePolicy, ReportTextPolicy};
use mutect2_bsvi::processor::BsviProcessor;
use mutect2_bsvi::splitter::DEFAULT_SPLITTER;
use mutect2_bsvi::validator::{require_tool, EnvironmentError, FileValidator};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Annotated Mutect2 VCF (.vcf or .vcf.gz)
    input: PathBuf,

    /// Reference FASTA passed to the multiallelic splitter
    reference: Option<PathBuf>,

    /// Directory for the output files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Write only the normalized VCF, skip the TSV table
    #[arg(long)]
    vcf_only: bool,

    /// Input is already split; do not run the splitter
    #[arg(long)]
    no_split: bool,

    /// Gzip the output VCF in the background once written
    #[arg(long)]
    compress: bool,

    /// How empty fields appear in the report text
    #[arg(long, value_enum, default_value_t = ReportMissing::None)]
    report_missing: ReportMissing,

    /// Keep all cross-reference matches or only the first
    #[arg(long, value_enum, default_value_t = CrossRefs::All)]
    cross_refs: CrossRefs,

    /// INFO key holding the annotation payload
    #[arg(long, default_value = "CSQ")]
    annotation_key: String,

    /// Part of the input file name replaced in the output names
    #[arg(long, default_value = "vepfilter")]
    rename_from: String,

    /// Replacement used in the output names
    #[arg(long, default_value = "bsvi")]
    rename_to: String,

    /// bcftools executable
    #[arg(long, env = "BCFTOOLS", default_value = DEFAULT_SPLITTER)]
    splitter_bin: String,

    /// Append a JSON-lines audit trail to this file
    #[arg(long)]
    audit_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportMissing {
    /// Render empty values as "None"
    None,
    /// Leave empty values blank
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CrossRefs {
    /// Join every match with ','
    All,
    /// Keep the first match only
    First,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.input);
        config.reference_path = self.reference;
        config.output_dir = self.output_dir;
        config.split_multiallelics = !self.no_split;
        config.splitter_program = self.splitter_bin;
        config.emit_derived_table = !self.vcf_only;
        config.report_text_policy = match self.report_missing {
            ReportMissing::None => ReportTextPolicy::ExplicitNone,
            ReportMissing::Blank => ReportTextPolicy::Blank,
        };
        config.cross_reference_policy = match self.cross_refs {
            CrossRefs::All => CrossReferencePolicy::JoinAll,
            CrossRefs::First => CrossReferencePolicy::FirstMatchOnly,
        };
        config.annotation_key = self.annotation_key;
        config.rename_from = self.rename_from;
        config.rename_to = self.rename_to;
        config.compress_with = self.compress.then(|| DEFAULT_COMPRESSOR.to_string());
        config.audit_log = self.audit_log;
        config
    }
}

/// Check everything the run depends on before touching any data
fn validate_environment(config: &PipelineConfig) -> Result<(), EnvironmentError> {
    let validator = FileValidator::new();
    validator.validate_input(&config.input_path)?;

    if let Some(reference) = &config.reference_path {
        validator.validate_reference(reference)?;
        if !config.split_multiallelics {
            warn!("Reference {:?} is ignored because splitting is disabled", reference);
        }
    }

    if !config.output_dir.is_dir() {
        return Err(EnvironmentError::ArgumentError(format!(
            "output directory does not exist: {}",
            config.output_dir.display()
        )));
    }

    for tool in config.required_tools() {
        require_tool(tool)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    // Logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mutect2_bsvi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.into_config();

    info!("Mutect2 BSVI converter starting...");
    info!("Configuration: {}", serde_json::to_string(&config)?);

    validate_environment(&config)?;

    let outcome = BsviProcessor::new(config).run()?;

    info!("Normalized VCF: {:?}", outcome.vcf_path);
    if let Some(tsv_path) = &outcome.tsv_path {
        info!("BSVI table: {:?}", tsv_path);
    }
    info!(
        "Done: {} records, {} multiallelic genotypes collapsed",
        outcome.records, outcome.genotypes_rewritten
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Args::parse_from(["mutect2-bsvi", "tumor.vepfilter.vcf.gz"]).into_config();

        assert!(config.split_multiallelics);
        assert!(config.emit_derived_table);
        assert!(config.reference_path.is_none());
        assert!(config.compress_with.is_none());
        assert_eq!(config.report_text_policy, ReportTextPolicy::ExplicitNone);
        assert_eq!(config.cross_reference_policy, CrossReferencePolicy::JoinAll);
    }

    #[test]
    fn test_flags() {
        let config = Args::parse_from([
            "mutect2-bsvi",
            "tumor.vcf",
            "hs37d5.fa",
            "--vcf-only",
            "--no-split",
            "--compress",
            "--report-missing",
            "blank",
            "--cross-refs",
            "first",
            "--annotation-key",
            "ANN",
        ])
        .into_config();

        assert_eq!(config.reference_path, Some(PathBuf::from("hs37d5.fa")));
        assert!(!config.split_multiallelics);
        assert!(!config.emit_derived_table);
        assert_eq!(config.compress_with.as_deref(), Some("gzip"));
        assert_eq!(config.report_text_policy, ReportTextPolicy::Blank);
        assert_eq!(config.cross_reference_policy, CrossReferencePolicy::FirstMatchOnly);
        assert_eq!(config.annotation_key, "ANN");
    }

    #[test]
    fn test_missing_input_argument() {
        assert!(Args::try_parse_from(["mutect2-bsvi"]).is_err());
    }
}
