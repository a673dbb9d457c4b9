// ==============================================================================
// models.rs - Record Data Models
// ==============================================================================
// Description: Data structures for single-sample somatic VCF records and the
//              decomposed annotation table handed to BSVI
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};

/// The ten fixed VCF columns, in file order
pub const VCF_COLUMNS: [&str; 10] = [
    "CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT", "SAMPLE",
];

/// Columns of the derived BSVI table, in output order
pub const TABLE_COLUMNS: [&str; 22] = [
    "CHROM",
    "POS",
    "ID",
    "REF",
    "ALT",
    "QUAL",
    "FILTER",
    "FORMAT",
    "SAMPLE",
    "GENE",
    "VARIANT_CLASS",
    "CONS",
    "EXON",
    "HGVSc",
    "HGVSp",
    "gnomAD_AF",
    "SIFT",
    "POLYPHEN",
    "COSMIC",
    "CLINVAR",
    "dbSNP",
    "Report_text",
];

/// One data line of a single-sample VCF
///
/// Every column except `pos` is kept as its raw text, and the reader only
/// accepts canonical positions, so an unmodified record serializes back byte
/// for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VCFRecord {
    pub chrom: String,
    /// 1-based position
    pub pos: u64,
    pub id: String,
    pub reference: String,
    pub alt: String,
    pub qual: String,
    pub filter: String,
    /// Semicolon-delimited key[=value] pairs, one of which carries the
    /// pipe-delimited annotation payload
    pub info: String,
    /// Colon-delimited field names, GT first
    pub format: String,
    /// Colon-delimited values aligned to `format`, genotype first
    pub sample: String,
}

impl VCFRecord {
    /// Copy of this record with a replacement sample column
    pub fn with_sample(&self, sample: String) -> Self {
        Self {
            sample,
            ..self.clone()
        }
    }

    /// "chrom:pos" locus used in diagnostics
    pub fn locus(&self) -> String {
        format!("{}:{}", self.chrom, self.pos)
    }

    /// Columns in VCF order
    pub fn columns(&self) -> [String; 10] {
        [
            self.chrom.clone(),
            self.pos.to_string(),
            self.id.clone(),
            self.reference.clone(),
            self.alt.clone(),
            self.qual.clone(),
            self.filter.clone(),
            self.info.clone(),
            self.format.clone(),
            self.sample.clone(),
        ]
    }
}

/// Positional sub-fields of the annotation payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub gene: String,
    pub variant_class: String,
    pub consequence: String,
    pub exon: String,
    pub hgvsc: String,
    pub hgvsp: String,
    pub gnomad_af: String,
    pub sift: String,
    pub polyphen: String,
    /// Composite cross-reference field (everything after the 9th delimiter)
    pub db: String,
}

/// Identifiers pulled out of the composite cross-reference field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferences {
    /// COSMIC ids (`COS` prefix)
    pub cosmic: String,
    /// Clinical catalog ids (`CM` prefix)
    pub clinvar: String,
    /// dbSNP ids (`rs` prefix)
    pub dbsnp: String,
}

/// A record after annotation decomposition: INFO and the raw DB field are
/// gone, replaced by named columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    pub record: VCFRecord,
    pub annotation: Annotation,
    pub cross_references: CrossReferences,
    pub report_text: String,
}

impl AnnotatedRecord {
    /// Row values in `TABLE_COLUMNS` order
    pub fn table_row(&self) -> [String; 22] {
        let r = &self.record;
        let a = &self.annotation;
        let x = &self.cross_references;
        [
            r.chrom.clone(),
            r.pos.to_string(),
            r.id.clone(),
            r.reference.clone(),
            r.alt.clone(),
            r.qual.clone(),
            r.filter.clone(),
            r.format.clone(),
            r.sample.clone(),
            a.gene.clone(),
            a.variant_class.clone(),
            a.consequence.clone(),
            a.exon.clone(),
            a.hgvsc.clone(),
            a.hgvsp.clone(),
            a.gnomad_af.clone(),
            a.sift.clone(),
            a.polyphen.clone(),
            x.cosmic.clone(),
            x.clinvar.clone(),
            x.dbsnp.clone(),
            self.report_text.clone(),
        ]
    }
}

/// How empty fields render in the report text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTextPolicy {
    /// Empty values render as an empty string
    Blank,
    /// Empty values render as the literal `None`
    #[default]
    ExplicitNone,
}

impl ReportTextPolicy {
    pub fn render<'a>(&self, value: &'a str) -> &'a str {
        match self {
            ReportTextPolicy::ExplicitNone if value.is_empty() => "None",
            _ => value,
        }
    }
}

/// Which matches survive per cross-reference namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossReferencePolicy {
    /// All matches joined with `,`
    #[default]
    JoinAll,
    /// Only the first match is kept
    FirstMatchOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> VCFRecord {
        VCFRecord {
            chrom: "chr7".to_string(),
            pos: 140453136,
            id: ".".to_string(),
            reference: "A".to_string(),
            alt: "T".to_string(),
            qual: ".".to_string(),
            filter: "PASS".to_string(),
            info: "CSQ=BRAF".to_string(),
            format: "GT:AD".to_string(),
            sample: "0/1:20,7".to_string(),
        }
    }

    #[test]
    fn test_with_sample_leaves_other_columns() {
        let original = record();
        let updated = original.with_sample("0/1:1,1".to_string());

        assert_eq!(updated.sample, "0/1:1,1");
        assert_eq!(updated.info, original.info);
        assert_eq!(original.sample, "0/1:20,7");
    }

    #[test]
    fn test_locus() {
        assert_eq!(record().locus(), "chr7:140453136");
    }

    #[test]
    fn test_report_text_policy_render() {
        assert_eq!(ReportTextPolicy::ExplicitNone.render(""), "None");
        assert_eq!(ReportTextPolicy::ExplicitNone.render("0.01"), "0.01");
        assert_eq!(ReportTextPolicy::Blank.render(""), "");
    }

    #[test]
    fn test_table_row_skips_info() {
        let annotated = AnnotatedRecord {
            record: record(),
            annotation: Annotation {
                gene: "BRAF".to_string(),
                ..Default::default()
            },
            cross_references: CrossReferences::default(),
            report_text: String::new(),
        };

        let row = annotated.table_row();
        assert_eq!(row.len(), TABLE_COLUMNS.len());
        assert_eq!(row[7], "GT:AD");
        assert_eq!(row[9], "BRAF");
        assert!(!row.contains(&"CSQ=BRAF".to_string()));
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&CrossReferencePolicy::FirstMatchOnly).unwrap();
        assert_eq!(json, "\"first_match_only\"");
        let policy: ReportTextPolicy = serde_json::from_str("\"blank\"").unwrap();
        assert_eq!(policy, ReportTextPolicy::Blank);
    }
}
