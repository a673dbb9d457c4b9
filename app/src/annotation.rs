// ==============================================================================
// annotation.rs - VEP Annotation Decomposition
// ==============================================================================
// Description: Splits the pipe-delimited CSQ payload in INFO into named BSVI
//              columns, pulls out database cross-references and builds the
//              report text
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Payload layout (positional, at least 9 '|' delimiters):
//   GENE|VARIANT_CLASS|CONS|EXON|HGVSc|HGVSp|gnomAD_AF|SIFT|POLYPHEN|DB
// DB absorbs everything after the 9th delimiter and mixes COSMIC (COS...),
// clinical (CM...) and dbSNP (rs...) identifiers joined by '&', '|' or ','.
// ==============================================================================

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    AnnotatedRecord, Annotation, CrossReferencePolicy, CrossReferences, ReportTextPolicy,
    VCFRecord,
};

/// Default INFO key carrying the VEP payload
pub const DEFAULT_ANNOTATION_KEY: &str = "CSQ";

/// Number of positional sub-fields in the payload
pub const ANNOTATION_FIELDS: usize = 10;

const COSMIC_PREFIX: &str = "COS";
const CLINVAR_PREFIX: &str = "CM";
const DBSNP_PREFIX: &str = "rs";

/// Annotation decomposition errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error(
        "Incorrectly formatted INFO field at {chrom}:{pos}: found {delimiters} '|' delimiters, \
         need at least {}",
        ANNOTATION_FIELDS - 1
    )]
    MalformedAnnotation {
        chrom: String,
        pos: u64,
        delimiters: usize,
    },
}

/// Decomposes INFO annotation payloads into BSVI table rows
#[derive(Debug, Clone)]
pub struct AnnotationDecomposer {
    /// INFO key whose value holds the payload, without '='
    pub key: String,
    pub report_policy: ReportTextPolicy,
    pub cross_reference_policy: CrossReferencePolicy,
}

impl Default for AnnotationDecomposer {
    fn default() -> Self {
        Self {
            key: DEFAULT_ANNOTATION_KEY.to_string(),
            report_policy: ReportTextPolicy::default(),
            cross_reference_policy: CrossReferencePolicy::default(),
        }
    }
}

impl AnnotationDecomposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the INFO key carrying the payload (e.g. "CSQ" or "ANN")
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_report_policy(mut self, policy: ReportTextPolicy) -> Self {
        self.report_policy = policy;
        self
    }

    pub fn with_cross_reference_policy(mut self, policy: CrossReferencePolicy) -> Self {
        self.cross_reference_policy = policy;
        self
    }

    fn tag(&self) -> String {
        format!("{}=", self.key)
    }

    /// Pick the `KEY=...` entry out of a semicolon-delimited INFO string
    ///
    /// Falls back to the whole INFO string when no entry carries the key, in
    /// which case the key tag is still stripped from the first sub-field.
    pub fn isolate_payload<'a>(&self, info: &'a str) -> &'a str {
        let tag = self.tag();
        info.split(';')
            .find(|entry| entry.starts_with(&tag))
            .unwrap_or(info)
    }

    /// Split a payload into its ten positional sub-fields
    ///
    /// Returns the number of delimiters found when there are too few.
    pub fn split_payload(&self, payload: &str) -> Result<Annotation, usize> {
        let delimiters = payload.matches('|').count();
        if delimiters < ANNOTATION_FIELDS - 1 {
            return Err(delimiters);
        }

        let fields: Vec<&str> = payload.splitn(ANNOTATION_FIELDS, '|').collect();
        let tag = self.tag();

        Ok(Annotation {
            gene: fields[0].replace(&tag, ""),
            variant_class: fields[1].to_string(),
            consequence: fields[2].to_string(),
            exon: fields[3].to_string(),
            hgvsc: fields[4].to_string(),
            hgvsp: fields[5].to_string(),
            gnomad_af: fields[6].to_string(),
            sift: fields[7].to_string(),
            polyphen: fields[8].to_string(),
            db: fields[9].to_string(),
        })
    }

    /// Pull COSMIC, clinical and dbSNP ids out of the composite DB field
    pub fn extract_cross_references(&self, db: &str) -> CrossReferences {
        let tokens: Vec<&str> = db.split(['&', '|', ',']).collect();

        CrossReferences {
            cosmic: self.collect_prefixed(&tokens, COSMIC_PREFIX),
            clinvar: self.collect_prefixed(&tokens, CLINVAR_PREFIX),
            dbsnp: self.collect_prefixed(&tokens, DBSNP_PREFIX),
        }
    }

    fn collect_prefixed(&self, tokens: &[&str], prefix: &str) -> String {
        let mut matches = tokens.iter().copied().filter(|t| t.starts_with(prefix));

        match self.cross_reference_policy {
            CrossReferencePolicy::JoinAll => matches.collect::<Vec<_>>().join(","),
            CrossReferencePolicy::FirstMatchOnly => {
                matches.next().map(str::to_string).unwrap_or_default()
            }
        }
    }

    /// Build the free-text report for one record
    ///
    /// Line breaks are the two-character sequence `\n` so the text stays on a
    /// single row of the table.
    pub fn report_text(&self, annotation: &Annotation, xrefs: &CrossReferences) -> String {
        let p = self.report_policy;
        format!(
            "{} {} variant in {} \\n{} \\n {} \\n COSMIC ID: {} \\nAllele Frequency: {}",
            p.render(&annotation.gene),
            p.render(&annotation.variant_class),
            p.render(&annotation.exon),
            p.render(&annotation.hgvsc),
            p.render(&annotation.hgvsp),
            p.render(&xrefs.cosmic),
            p.render(&annotation.gnomad_af),
        )
    }

    /// Decompose one record
    pub fn decompose(&self, record: &VCFRecord) -> Result<AnnotatedRecord, AnnotationError> {
        let payload = self.isolate_payload(&record.info);

        let annotation =
            self.split_payload(payload)
                .map_err(|delimiters| AnnotationError::MalformedAnnotation {
                    chrom: record.chrom.clone(),
                    pos: record.pos,
                    delimiters,
                })?;

        let cross_references = self.extract_cross_references(&annotation.db);
        let report_text = self.report_text(&annotation, &cross_references);

        debug!(
            "Decomposed {}: gene={} cosmic={} dbsnp={}",
            record.locus(),
            annotation.gene,
            cross_references.cosmic,
            cross_references.dbsnp
        );

        Ok(AnnotatedRecord {
            record: record.clone(),
            annotation,
            cross_references,
            report_text,
        })
    }

    /// Decompose every record in file order; one bad payload fails the batch
    pub fn decompose_all(
        &self,
        records: &[VCFRecord],
    ) -> Result<Vec<AnnotatedRecord>, AnnotationError> {
        let annotated = records
            .iter()
            .map(|record| self.decompose(record))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Split {} INFO annotations into table columns", annotated.len());
        Ok(annotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_info(info: &str) -> VCFRecord {
        VCFRecord {
            chrom: "chr1".to_string(),
            pos: 100,
            id: ".".to_string(),
            reference: "A".to_string(),
            alt: "T".to_string(),
            qual: ".".to_string(),
            filter: "PASS".to_string(),
            info: info.to_string(),
            format: "GT:AD".to_string(),
            sample: "0/1:10,5,3".to_string(),
        }
    }

    const FULL_PAYLOAD: &str = "CSQ=BRCA1|SNV|missense_variant|10/23|c.181T>G|p.Cys61Gly|0.0001|deleterious(0)|probably_damaging(1)|COSV58786069&CM940194|rs28897672";

    #[test]
    fn test_split_exact_ten_fields() {
        let decomposer = AnnotationDecomposer::new();
        let annotation = decomposer
            .split_payload("CSQ=TP53|SNV|stop_gained|5/11|c.1A>T|p.M1?|0.1|tolerated|benign|COS1")
            .unwrap();

        assert_eq!(annotation.gene, "TP53");
        assert_eq!(annotation.variant_class, "SNV");
        assert_eq!(annotation.consequence, "stop_gained");
        assert_eq!(annotation.exon, "5/11");
        assert_eq!(annotation.hgvsc, "c.1A>T");
        assert_eq!(annotation.hgvsp, "p.M1?");
        assert_eq!(annotation.gnomad_af, "0.1");
        assert_eq!(annotation.sift, "tolerated");
        assert_eq!(annotation.polyphen, "benign");
        assert_eq!(annotation.db, "COS1");
    }

    #[test]
    fn test_db_absorbs_remainder() {
        let annotation = AnnotationDecomposer::new().split_payload(FULL_PAYLOAD).unwrap();

        assert_eq!(annotation.gene, "BRCA1");
        assert_eq!(annotation.db, "COSV58786069&CM940194|rs28897672");
    }

    #[test]
    fn test_too_few_delimiters() {
        let record = record_with_info("CSQ=BRCA1|SNV|missense_variant|10/23|c.181T>G|p.Cys61Gly|0.0001|deleterious(0)|probably_damaging(1)");
        let err = AnnotationDecomposer::new().decompose(&record).unwrap_err();

        assert_eq!(
            err,
            AnnotationError::MalformedAnnotation {
                chrom: "chr1".to_string(),
                pos: 100,
                delimiters: 8,
            }
        );
    }

    #[test]
    fn test_isolate_payload_among_other_keys() {
        let decomposer = AnnotationDecomposer::new();
        let info = format!("DP=52;ECNT=1;{};TLOD=20.1", FULL_PAYLOAD);

        assert_eq!(decomposer.isolate_payload(&info), FULL_PAYLOAD);
        assert_eq!(decomposer.isolate_payload("DP=52"), "DP=52");
    }

    #[test]
    fn test_custom_key() {
        let decomposer = AnnotationDecomposer::new().with_key("ANN");
        let record = record_with_info("DP=3;ANN=KRAS|SNV|missense_variant|2/5|c.35G>A|p.G12D||||COSV55497369");
        let annotated = decomposer.decompose(&record).unwrap();

        assert_eq!(annotated.annotation.gene, "KRAS");
        assert_eq!(annotated.cross_references.cosmic, "COSV55497369");
    }

    #[test]
    fn test_cross_references_join_all() {
        let decomposer = AnnotationDecomposer::new();
        let xrefs = decomposer.extract_cross_references("COS123|rs456,CM007");

        assert_eq!(xrefs.cosmic, "COS123");
        assert_eq!(xrefs.clinvar, "CM007");
        assert_eq!(xrefs.dbsnp, "rs456");

        let xrefs = decomposer.extract_cross_references("COS1&COS2|rs3,rs4&CM5");
        assert_eq!(xrefs.cosmic, "COS1,COS2");
        assert_eq!(xrefs.dbsnp, "rs3,rs4");
        assert_eq!(xrefs.clinvar, "CM5");
    }

    #[test]
    fn test_cross_references_first_match() {
        let decomposer = AnnotationDecomposer::new()
            .with_cross_reference_policy(CrossReferencePolicy::FirstMatchOnly);
        let xrefs = decomposer.extract_cross_references("COS1&COS2|rs3,rs4");

        assert_eq!(xrefs.cosmic, "COS1");
        assert_eq!(xrefs.dbsnp, "rs3");
        assert_eq!(xrefs.clinvar, "");
    }

    #[test]
    fn test_cross_references_empty() {
        let xrefs = AnnotationDecomposer::new().extract_cross_references("");
        assert_eq!(xrefs, CrossReferences::default());
    }

    #[test]
    fn test_report_text_explicit_none() {
        let record = record_with_info("CSQ=BRCA1|SNV|missense_variant||c.181T>G|p.Cys61Gly||||rs2");
        let annotated = AnnotationDecomposer::new().decompose(&record).unwrap();

        assert_eq!(
            annotated.report_text,
            "BRCA1 SNV variant in None \\nc.181T>G \\n p.Cys61Gly \\n COSMIC ID: None \\nAllele Frequency: None"
        );
    }

    #[test]
    fn test_report_text_blank() {
        let record = record_with_info("CSQ=BRCA1|SNV|missense_variant||c.181T>G|p.Cys61Gly||||rs2");
        let annotated = AnnotationDecomposer::new()
            .with_report_policy(ReportTextPolicy::Blank)
            .decompose(&record)
            .unwrap();

        assert_eq!(
            annotated.report_text,
            "BRCA1 SNV variant in  \\nc.181T>G \\n p.Cys61Gly \\n COSMIC ID:  \\nAllele Frequency: "
        );
        assert!(!annotated.report_text.contains('\n'));
    }

    #[test]
    fn test_decompose_all_preserves_order() {
        let records = vec![
            record_with_info("CSQ=A|||||||||COS1"),
            record_with_info("CSQ=B|||||||||rs2"),
        ];
        let annotated = AnnotationDecomposer::new().decompose_all(&records).unwrap();

        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].annotation.gene, "A");
        assert_eq!(annotated[1].annotation.gene, "B");
        assert_eq!(annotated[1].cross_references.dbsnp, "rs2");
    }
}
