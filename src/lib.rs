// ==============================================================================
// lib.rs - nCoV Surveillance Database Loader Library
// ==============================================================================
// Description: Library interface for loading genomic-surveillance pipeline
//              outputs into a relational store
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-18
// Version: 0.3.0
// ==============================================================================

pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod identifiers;
pub mod loader;
pub mod models;
pub mod normalizer;
pub mod parsers;
pub mod run;
pub mod store;
