//! # Optimizer Module
//!
//! Orchestrazione della pipeline completa su un documento:
//! - `document_optimizer`: Extractor → ImageOptimizer → Packer su un working tree

pub mod document_optimizer;

pub use document_optimizer::{DocumentOptimizer, RunSummary};
