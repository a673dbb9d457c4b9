// ==============================================================================
// lib.rs - Mutect2 BSVI Converter Library
// ==============================================================================
// Description: Library interface for the Mutect2 VCF to BSVI conversion modules
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

pub mod annotation;
pub mod audit;
pub mod config;
pub mod genotype_normalizer;
pub mod models;
pub mod output;
pub mod parsers;
pub mod processor;
pub mod splitter;
pub mod validator;
