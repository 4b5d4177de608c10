//! enrich-core: enrichment of raw banking tables for downstream risk and
//! behavior analysis.
//!
//! The transformation primitives (mapping, address, names, temporal, join,
//! aggregate) compose into per-entity enrichers under `enrich`. Everything
//! else moves tables in and out: ingest, store, export, and the pipeline
//! that runs the extract → transform → load steps.

pub mod address;
pub mod aggregate;
pub mod clock;
pub mod config;
pub mod enrich;
pub mod error;
pub mod event;
pub mod export;
pub mod extract_step;
pub mod ingest;
pub mod join;
pub mod load_step;
pub mod names;
pub mod pipeline;
pub mod reference;
pub mod schema;
pub mod step;
pub mod store;
pub mod table;
pub mod temporal;
pub mod transform_step;
pub mod types;
