//! # File Management Module
//!
//! Questo modulo raccoglie le operazioni sui file usate dalle varie fasi.
//!
//! ## Operazioni sui file:
//! - `default_output_path()`: `<stem>_optimized.<ext>` accanto all'input
//! - `list_pictures()`: Elenco non ricorsivo della directory `Pictures/`
//! - `raster_format()`: Formato di codifica dedotto dall'estensione
//! - `get_file_size()` / `sha256_file()`: Dimensione e digest di un file
//!
//! ## Utilità:
//! - `format_size()`: Converte bytes in formato leggibile (KB, MB, GB)
//! - `calculate_reduction()`: Calcola percentuale di riduzione

use anyhow::{Context, Result};
use image::ImageFormat;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory of the container holding the raster assets
pub const PICTURES_DIR: &str = "Pictures";

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Output path used when none is given: `report.odt` -> `report_optimized.odt`
    pub fn default_output_path(input: &Path) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", input.display()))?
            .to_string_lossy();

        let file_name = match input.extension() {
            Some(ext) => format!("{}_optimized.{}", stem, ext.to_string_lossy()),
            None => format!("{}_optimized", stem),
        };

        Ok(input.with_file_name(file_name))
    }

    /// Regular files directly inside `root/Pictures`, sorted by name.
    /// Subdirectories are not descended into; a missing directory yields nothing.
    pub fn list_pictures(root: &Path) -> io::Result<Vec<PathBuf>> {
        let pictures = root.join(PICTURES_DIR);
        if !pictures.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&pictures)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Encoding format named by the file extension, taken verbatim
    pub fn raster_format(path: &Path) -> Option<ImageFormat> {
        path.extension().and_then(ImageFormat::from_extension)
    }

    pub fn get_file_size(path: &Path) -> Result<u64> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to read metadata of {}", path.display()))?;
        Ok(metadata.len())
    }

    /// Hex-encoded SHA-256 of a file's content
    pub fn sha256_file(path: &Path) -> Result<String> {
        let mut file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)
            .with_context(|| format!("Failed to hash {}", path.display()))?;
        Ok(hex::encode(hasher.finalize()))
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
