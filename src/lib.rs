//! # Office Image Optimizer Library
//!
//! Riduce le immagini sovradimensionate dentro un documento office
//! (contenitore zip con manifest XML e media incorporati).
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom della pipeline
//! - `working_tree`: Directory temporanea condivisa fra le fasi
//! - `archive`: Estrazione e ri-archiviazione zip (`Extractor`, `Packer`)
//! - `image_processor`: Ridimensionamento delle immagini in `Pictures/`
//! - `optimizer`: Orchestratore della pipeline completa
//! - `file_manager`: Operazioni sui file e naming dell'output
//! - `progress`: Progress bar e statistiche
//! - `json_output`: Eventi JSON per uso programmatico
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use office_image_optimizer::{Config, DocumentOptimizer};
//!
//! let optimizer = DocumentOptimizer::new(Config::default())?;
//! let summary = optimizer.optimize_file(Path::new("report.odt"), Path::new("report_optimized.odt"))?;
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod optimizer;
pub mod progress;
pub mod working_tree;

pub use config::Config;
pub use error::OptimizeError;
pub use image_processor::{ImageOptimizer, ImageOutcome};
pub use optimizer::{DocumentOptimizer, RunSummary};
