//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking delle tre fasi e le statistiche
//! di ottimizzazione delle immagini.
//!
//! ## Componenti principali:
//! - `ProgressManager`: Progress bar per fase (estrazione, immagini, packing)
//! - `OptimizationStats`: Statistiche cumulative sulle immagini in `Pictures/`
//!
//! ## Statistiche tracciate:
//! - **images_processed**: Totale file elaborati in `Pictures/`
//! - **images_resized**: Immagini ridimensionate e ricodificate
//! - **images_untouched**: Immagini già entro la soglia (byte identici)
//! - **files_skipped**: File non raster (svm, wmf, ...) lasciati invariati
//! - **total_bytes_saved**: Byte risparmiati dalle immagini ridimensionate
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:02] [========================================] 42/42 (100%) Pictures/1000.png
//! ```
//!
//! Le barre sono nascoste in modalità JSON e nei test (`ProgressManager::hidden`).

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Manages progress reporting for one pipeline stage
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a visible progress bar for `total` items
    pub fn new(total: u64, prefix: &str) -> Self {
        let bar = ProgressBar::new(total);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix:>10} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_prefix(prefix.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Visible bar unless `quiet` is set
    pub fn for_stage(total: u64, prefix: &str, quiet: bool) -> Self {
        if quiet {
            Self::hidden()
        } else {
            Self::new(total, prefix)
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn set_length(&self, total: u64) {
        self.bar.set_length(total);
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Statistics tracker for image optimization results
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStats {
    pub images_processed: usize,
    pub images_resized: usize,
    pub images_untouched: usize,
    pub files_skipped: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resized(&mut self, original_size: u64, new_size: u64) {
        self.images_processed += 1;
        self.images_resized += 1;
        self.total_original_size += original_size;
        self.total_bytes_saved += original_size.saturating_sub(new_size);
    }

    pub fn add_untouched(&mut self, original_size: u64) {
        self.images_processed += 1;
        self.images_untouched += 1;
        self.total_original_size += original_size;
    }

    pub fn add_skipped(&mut self, original_size: u64) {
        self.images_processed += 1;
        self.files_skipped += 1;
        self.total_original_size += original_size;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(
            self.total_original_size,
            self.total_original_size.saturating_sub(self.total_bytes_saved),
        )
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Resized: {} | Untouched: {} | Skipped: {} | Total saved: {} ({:.2}%)",
            self.images_processed,
            self.images_resized,
            self.images_untouched,
            self.files_skipped,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}
