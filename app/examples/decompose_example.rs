// ==============================================================================
// decompose_example.rs - Genotype Normalization and Annotation Example
// ==============================================================================
// Description: Demonstrates collapsing residual multiallelic genotypes and
//              splitting a CSQ payload into BSVI table columns
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use mutect2_bsvi::annotation::AnnotationDecomposer;
use mutect2_bsvi::genotype_normalizer::{classify_genotype, normalize_genotype};
use mutect2_bsvi::models::{CrossReferencePolicy, ReportTextPolicy, TABLE_COLUMNS};
use mutect2_bsvi::parsers::vcf::parse_record;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Mutect2 BSVI Decomposition Example ===\n");

    // Example 1: Genotype normalization
    println!("--- Example 1: Genotype Normalization ---\n");
    println!("{:<12} {:<24} {}", "Genotype", "Class", "Normalized");
    println!("{:-<50}", "");

    for genotype in ["0/1", "0|1", "0/0/1/0", "0/1/0", "1"] {
        let normalized = normalize_genotype(genotype).unwrap_or("(invalid)");
        println!(
            "{:<12} {:<24} {}",
            genotype,
            format!("{:?}", classify_genotype(genotype)),
            normalized
        );
    }

    // Example 2: Annotation decomposition
    println!("\n--- Example 2: Annotation Decomposition ---\n");

    let line = "chr17\t41245466\t.\tG\tA\t.\tPASS\tDP=88;CSQ=BRCA1|SNV|missense_variant|10/23|c.181T>G|p.Cys61Gly|0.0001|deleterious(0)|probably_damaging(1)|COSV58786069&CM940194|rs28897672\tGT:AD:AF\t0/0/1/0:50,38,0:0.43";
    let record = parse_record(line, 1)?;

    let decomposer = AnnotationDecomposer::new();
    let annotated = decomposer.decompose(&record)?;

    for (column, value) in TABLE_COLUMNS.iter().zip(annotated.table_row().iter()) {
        println!("{:<14} {}", column, value);
    }

    // Example 3: Alternative policies
    println!("\n--- Example 3: First Match Only, Blank Report Fields ---\n");

    let decomposer = AnnotationDecomposer::new()
        .with_cross_reference_policy(CrossReferencePolicy::FirstMatchOnly)
        .with_report_policy(ReportTextPolicy::Blank);
    let xrefs = decomposer.extract_cross_references("COSV1&COSV2|rs5,CM7");

    println!("COSMIC:  {}", xrefs.cosmic);
    println!("CLINVAR: {}", xrefs.clinvar);
    println!("dbSNP:   {}", xrefs.dbsnp);

    println!("\n=== Example Complete ===");
    Ok(())
}
