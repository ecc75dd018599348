//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per uso programmatico
//! (`--json`). Un messaggio per riga su stdout.
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della run (input, output, configurazione)
//! - `image_complete`: Esito di una singola immagine in `Pictures/`
//! - `complete`: Fine della run con statistiche finali
//! - `error`: Errore fatale

use crate::image_processor::ImageReport;
use crate::optimizer::RunSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio della run
    #[serde(rename = "start")]
    Start {
        input_file: PathBuf,
        output_file: PathBuf,
        config: JsonConfig,
    },

    /// Esito di una singola immagine
    #[serde(rename = "image_complete")]
    ImageComplete {
        #[serde(flatten)]
        report: ImageReport,
    },

    /// Run completata
    #[serde(rename = "complete")]
    Complete {
        entries_extracted: usize,
        entries_skipped: Vec<String>,
        images_resized: usize,
        images_untouched: usize,
        files_skipped: usize,
        input_size: u64,
        output_size: u64,
        reduction_percent: f64,
        output_sha256: String,
        duration_seconds: f64,
    },

    /// Errore fatale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub max_dimension: u32,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(input_file: PathBuf, output_file: PathBuf, config: JsonConfig) -> Self {
        Self::Start {
            input_file,
            output_file,
            config,
        }
    }

    pub fn image_complete(report: &ImageReport) -> Self {
        Self::ImageComplete {
            report: report.clone(),
        }
    }

    pub fn complete(summary: &RunSummary) -> Self {
        let stats = &summary.optimization.stats;
        Self::Complete {
            entries_extracted: summary.extraction.files + summary.extraction.directories,
            entries_skipped: summary.extraction.skipped.clone(),
            images_resized: stats.images_resized,
            images_untouched: stats.images_untouched,
            files_skipped: stats.files_skipped,
            input_size: summary.input_size,
            output_size: summary.output_size,
            reduction_percent: summary.reduction_percent(),
            output_sha256: summary.output_sha256.clone(),
            duration_seconds: summary.duration.as_secs_f64(),
        }
    }

    /// Messaggio di errore con l'intera catena di cause
    pub fn error(err: &anyhow::Error) -> Self {
        let details = err
            .chain()
            .skip(1)
            .map(|cause| cause.to_string())
            .collect::<Vec<_>>();
        Self::Error {
            message: err.to_string(),
            details: if details.is_empty() {
                None
            } else {
                Some(details.join(": "))
            },
        }
    }
}

/// Converti Config esistente in JsonConfig
impl From<&crate::Config> for JsonConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            max_dimension: config.max_dimension,
        }
    }
}
