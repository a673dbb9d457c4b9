// ==============================================================================
// config.rs - Pipeline Configuration
// ==============================================================================
// Description: Explicit run configuration handed to the processor, plus the
//              output filename rules
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Output naming (from the input file name):
//   tumor_tnhaplotyper2.vepfilter.vcf.gz -> tumor_tnhaplotyper2.bsvi.vcf
//                                        -> tumor_tnhaplotyper2.bsvi.tsv
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::annotation::DEFAULT_ANNOTATION_KEY;
use crate::models::{CrossReferencePolicy, ReportTextPolicy};
use crate::splitter::DEFAULT_SPLITTER;

/// Default compressor for the fire-and-forget post-step
pub const DEFAULT_COMPRESSOR: &str = "gzip";

/// Everything a single run needs, resolved up front
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    /// Reference FASTA for the splitter
    pub reference_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Run the external multiallelic splitter before reading
    pub split_multiallelics: bool,
    pub splitter_program: String,
    /// Write the decomposed TSV next to the VCF
    pub emit_derived_table: bool,
    pub report_text_policy: ReportTextPolicy,
    pub cross_reference_policy: CrossReferencePolicy,
    /// INFO key holding the annotation payload
    pub annotation_key: String,
    /// Substring of the input name replaced to form the output name
    pub rename_from: String,
    pub rename_to: String,
    /// Compressor launched on the finished VCF, if any
    pub compress_with: Option<String>,
    /// JSON-lines audit trail destination
    pub audit_log: Option<PathBuf>,
}

impl PipelineConfig {
    /// Defaults matching the BSVI import workflow
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            reference_path: None,
            output_dir: PathBuf::from("."),
            split_multiallelics: true,
            splitter_program: DEFAULT_SPLITTER.to_string(),
            emit_derived_table: true,
            report_text_policy: ReportTextPolicy::default(),
            cross_reference_policy: CrossReferencePolicy::default(),
            annotation_key: DEFAULT_ANNOTATION_KEY.to_string(),
            rename_from: "vepfilter".to_string(),
            rename_to: "bsvi".to_string(),
            compress_with: None,
            audit_log: None,
        }
    }

    /// External tools this configuration will invoke
    pub fn required_tools(&self) -> Vec<&str> {
        let mut tools = Vec::new();
        if self.split_multiallelics {
            tools.push(self.splitter_program.as_str());
        }
        if let Some(compressor) = &self.compress_with {
            tools.push(compressor.as_str());
        }
        tools
    }

    /// Destination of the normalized VCF
    pub fn vcf_output_path(&self) -> PathBuf {
        self.output_dir
            .join(derive_vcf_name(&self.input_path, &self.rename_from, &self.rename_to))
    }

    /// Destination of the derived table
    pub fn tsv_output_path(&self) -> PathBuf {
        let vcf_name = derive_vcf_name(&self.input_path, &self.rename_from, &self.rename_to);
        self.output_dir.join(derive_tsv_name(&vcf_name))
    }
}

/// Output VCF file name for an input path
///
/// Drops a trailing `.gz` (output is written uncompressed) and swaps
/// `rename_from` for `rename_to`. When the input name lacks `rename_from`,
/// `.<rename_to>` is inserted before `.vcf` so the input is never overwritten.
/// Extensions match case-insensitively, as the input validator accepts them.
pub fn derive_vcf_name(input: &Path, rename_from: &str, rename_to: &str) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match name.to_ascii_lowercase().strip_suffix(".gz") {
        Some(stem) => name[..stem.len()].to_string(),
        None => name,
    };

    if !rename_from.is_empty() && name.contains(rename_from) {
        return name.replace(rename_from, rename_to);
    }

    match find_vcf_extension(&name) {
        Some(idx) => format!("{}.{}{}", &name[..idx], rename_to, &name[idx..]),
        None => format!("{}.{}.vcf", name, rename_to),
    }
}

/// Table file name for an output VCF name
pub fn derive_tsv_name(vcf_name: &str) -> String {
    match find_vcf_extension(vcf_name) {
        Some(idx) => format!("{}.tsv{}", &vcf_name[..idx], &vcf_name[idx + 4..]),
        None => format!("{}.tsv", vcf_name),
    }
}

/// Byte offset of the last ".vcf", ignoring ASCII case
fn find_vcf_extension(name: &str) -> Option<usize> {
    name.to_ascii_lowercase().rfind(".vcf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_vcf_name_substitution() {
        let input = Path::new(
            "/data/2100616_21025Z0056_BM_AML_MYE_F_EGG_S8_L006_markdup_recalibrated_tnhaplotyper2.vepfilter.vcf",
        );
        assert_eq!(
            derive_vcf_name(input, "vepfilter", "bsvi"),
            "2100616_21025Z0056_BM_AML_MYE_F_EGG_S8_L006_markdup_recalibrated_tnhaplotyper2.bsvi.vcf"
        );
    }

    #[test]
    fn test_derive_vcf_name_strips_gz() {
        let input = Path::new("tumor.vepfilter.vcf.gz");
        assert_eq!(derive_vcf_name(input, "vepfilter", "bsvi"), "tumor.bsvi.vcf");
    }

    #[test]
    fn test_derive_vcf_name_never_reuses_input_name() {
        let input = Path::new("tumor.vcf");
        assert_eq!(derive_vcf_name(input, "vepfilter", "bsvi"), "tumor.bsvi.vcf");

        let input = Path::new("tumor_calls");
        assert_eq!(derive_vcf_name(input, "vepfilter", "bsvi"), "tumor_calls.bsvi.vcf");
    }

    #[test]
    fn test_derive_names_ignore_extension_case() {
        let input = Path::new("x.VCF.GZ");
        let vcf_name = derive_vcf_name(input, "vepfilter", "bsvi");
        assert_eq!(vcf_name, "x.bsvi.VCF");
        assert_eq!(derive_tsv_name(&vcf_name), "x.bsvi.tsv");

        let input = Path::new("Tumor.vepfilter.Vcf.Gz");
        assert_eq!(derive_vcf_name(input, "vepfilter", "bsvi"), "Tumor.bsvi.Vcf");
    }

    #[test]
    fn test_derive_tsv_name() {
        assert_eq!(derive_tsv_name("tumor.bsvi.vcf"), "tumor.bsvi.tsv");
        assert_eq!(derive_tsv_name("tumor"), "tumor.tsv");
    }

    #[test]
    fn test_output_paths() {
        let mut config = PipelineConfig::new("/in/tumor.vepfilter.vcf.gz");
        config.output_dir = PathBuf::from("/out");

        assert_eq!(config.vcf_output_path(), PathBuf::from("/out/tumor.bsvi.vcf"));
        assert_eq!(config.tsv_output_path(), PathBuf::from("/out/tumor.bsvi.tsv"));
    }

    #[test]
    fn test_required_tools() {
        let mut config = PipelineConfig::new("tumor.vcf");
        assert_eq!(config.required_tools(), vec!["bcftools"]);

        config.split_multiallelics = false;
        config.compress_with = Some(DEFAULT_COMPRESSOR.to_string());
        assert_eq!(config.required_tools(), vec!["gzip"]);
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("tumor.vcf");
        assert!(config.emit_derived_table);
        assert_eq!(config.annotation_key, "CSQ");
        assert_eq!(config.report_text_policy, ReportTextPolicy::ExplicitNone);
        assert_eq!(config.cross_reference_policy, CrossReferencePolicy::JoinAll);
    }
}
