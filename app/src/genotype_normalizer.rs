// ==============================================================================
// genotype_normalizer.rs - Multiallelic Genotype Normalization
// ==============================================================================
// Description: Collapses genotypes left over from multiallelic splitting into
//              the two-allele form BSVI accepts
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Algorithm:
//   After `bcftools norm -m -both` each record carries a single ALT, but the
//   GT subfield of the sample keeps one index per original allele:
//   - "0/1"     (3 chars)  → unchanged
//   - "0/0/1/0" (> 3 chars) → "0/1" (whichever alleles were listed)
//   - "1"       (< 3 chars) → error, needs manual review
// ==============================================================================

use thiserror::Error;
use tracing::{debug, info};

use crate::models::VCFRecord;

/// Genotype written in place of a multiallelic residual
pub const BIALLELIC_GENOTYPE: &str = "0/1";

/// Shortest valid genotype encoding ("0/1")
pub const MIN_GENOTYPE_LEN: usize = 3;

/// Errors that can occur during genotype normalization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenotypeError {
    #[error("Genotype field has < 3 characters: '{genotype}' at {chrom}:{pos}")]
    TooShort {
        chrom: String,
        pos: u64,
        genotype: String,
    },
}

/// Shape of a genotype token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenotypeClass {
    /// Shorter than any valid encoding
    Invalid,
    /// Minimal two-allele form, kept as is
    Biallelic,
    /// One index per pre-split allele, collapsed to "0/1"
    MultiallelicResidual,
}

/// Classify a genotype token by its length
pub fn classify_genotype(genotype: &str) -> GenotypeClass {
    match genotype.len() {
        n if n < MIN_GENOTYPE_LEN => GenotypeClass::Invalid,
        MIN_GENOTYPE_LEN => GenotypeClass::Biallelic,
        _ => GenotypeClass::MultiallelicResidual,
    }
}

/// Normalize a single genotype token
///
/// Returns `None` when the token is too short to be a genotype.
///
/// # Examples
/// ```
/// use mutect2_bsvi::genotype_normalizer::normalize_genotype;
///
/// assert_eq!(normalize_genotype("0/1"), Some("0/1"));
/// assert_eq!(normalize_genotype("0/0/1/0"), Some("0/1"));
/// assert_eq!(normalize_genotype("1"), None);
/// ```
pub fn normalize_genotype(genotype: &str) -> Option<&str> {
    match classify_genotype(genotype) {
        GenotypeClass::Invalid => None,
        GenotypeClass::Biallelic => Some(genotype),
        GenotypeClass::MultiallelicResidual => Some(BIALLELIC_GENOTYPE),
    }
}

/// Normalize the genotype of one record, returning a fresh record
///
/// The second element is true when the sample column was rewritten.
pub fn normalize_record(record: &VCFRecord) -> Result<(VCFRecord, bool), GenotypeError> {
    let mut subfields: Vec<&str> = record.sample.split(':').collect();
    let genotype = subfields[0];

    match classify_genotype(genotype) {
        GenotypeClass::Invalid => Err(GenotypeError::TooShort {
            chrom: record.chrom.clone(),
            pos: record.pos,
            genotype: genotype.to_string(),
        }),
        GenotypeClass::Biallelic => Ok((record.clone(), false)),
        GenotypeClass::MultiallelicResidual => {
            debug!(
                "Collapsing genotype {} -> {} at {}",
                genotype,
                BIALLELIC_GENOTYPE,
                record.locus()
            );
            subfields[0] = BIALLELIC_GENOTYPE;
            Ok((record.with_sample(subfields.join(":")), true))
        }
    }
}

/// Result of normalizing a whole record set
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecords {
    pub records: Vec<VCFRecord>,
    /// Number of records whose genotype was collapsed
    pub rewritten: usize,
}

/// Normalize every record in file order, stopping at the first invalid genotype
pub fn normalize_records(records: &[VCFRecord]) -> Result<NormalizedRecords, GenotypeError> {
    let mut normalized = Vec::with_capacity(records.len());
    let mut rewritten = 0;

    for record in records {
        let (record, changed) = normalize_record(record)?;
        if changed {
            rewritten += 1;
        }
        normalized.push(record);
    }

    info!(
        "Adjusted multiallelic genotypes: {} of {} records rewritten",
        rewritten,
        normalized.len()
    );

    Ok(NormalizedRecords {
        records: normalized,
        rewritten,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_sample(sample: &str) -> VCFRecord {
        VCFRecord {
            chrom: "chr1".to_string(),
            pos: 100,
            id: ".".to_string(),
            reference: "A".to_string(),
            alt: "T".to_string(),
            qual: ".".to_string(),
            filter: "PASS".to_string(),
            info: "DP=18".to_string(),
            format: "GT:AD".to_string(),
            sample: sample.to_string(),
        }
    }

    #[test]
    fn test_two_allele_unchanged() {
        for genotype in ["0/1", "1/1", "0/0", "0|1", "./."] {
            assert_eq!(classify_genotype(genotype), GenotypeClass::Biallelic);
            assert_eq!(normalize_genotype(genotype), Some(genotype));
        }
    }

    #[test]
    fn test_multiallelic_residual_collapsed() {
        for genotype in ["0/0/1", "0/0/1/0", "0/0/0/1", "0/1/1/0/0", "10/1"] {
            assert_eq!(
                normalize_genotype(genotype),
                Some(BIALLELIC_GENOTYPE),
                "{}",
                genotype
            );
        }
    }

    #[test]
    fn test_too_short() {
        for genotype in ["", "0", "1", "01"] {
            assert_eq!(classify_genotype(genotype), GenotypeClass::Invalid);
            assert_eq!(normalize_genotype(genotype), None, "{}", genotype);
        }
    }

    #[test]
    fn test_record_sample_rewritten() {
        let (record, changed) = normalize_record(&record_with_sample("0/0/1/0:10,5,3")).unwrap();

        assert!(changed);
        assert_eq!(record.sample, "0/1:10,5,3");
        assert_eq!(record.info, "DP=18");
    }

    #[test]
    fn test_record_without_extra_subfields() {
        let (record, changed) = normalize_record(&record_with_sample("0/0/1")).unwrap();

        assert!(changed);
        assert_eq!(record.sample, "0/1");
    }

    #[test]
    fn test_record_error_names_locus() {
        let err = normalize_record(&record_with_sample("1:7,3")).unwrap_err();

        assert_eq!(
            err,
            GenotypeError::TooShort {
                chrom: "chr1".to_string(),
                pos: 100,
                genotype: "1".to_string(),
            }
        );
        assert!(err.to_string().contains("chr1:100"));
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_records(&[
            record_with_sample("0/0/1/0:10,5,3"),
            record_with_sample("0/1:4,4"),
        ])
        .unwrap();
        let twice = normalize_records(&once.records).unwrap();

        assert_eq!(once.rewritten, 1);
        assert_eq!(twice.rewritten, 0);
        assert_eq!(once.records, twice.records);
    }

    #[test]
    fn test_batch_stops_on_invalid() {
        let result = normalize_records(&[
            record_with_sample("0/1:4,4"),
            record_with_sample("1:2,2"),
        ]);

        assert!(matches!(result, Err(GenotypeError::TooShort { .. })));
    }
}
