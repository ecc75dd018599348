//! # Extractor
//!
//! Legge l'archivio entry per entry e ne ricrea la struttura sotto una
//! directory di destinazione.
//!
//! ## Regole:
//! - Entry illeggibili per il codec (cifrate, compressione non supportata)
//!   vengono saltate con un warning, senza interrompere la run
//! - Entry con path che uscirebbe dalla destinazione vengono saltate allo stesso modo
//! - Entry directory: `create_dir_all`, "già esistente" non è un errore
//! - Entry file: directory parent creata, poi i byte copiati in un file nuovo
//! - Fallimento nella creazione di una directory: errore fatale
//! - Le directory presenti come entry esplicite vengono annotate nel summary,
//!   così il packer non aggiunge marker per i parent solo impliciti

use crate::archive::entry::{resolve_entry_path, ArchiveEntry};
use crate::error::OptimizeError;
use crate::progress::ProgressManager;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// What an extraction produced
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes_extracted: u64,
    /// Directories the archive listed as entries of their own, without the
    /// trailing slash
    pub directory_entries: Vec<String>,
    /// Names of entries that could not be read or were unsafe
    pub skipped: Vec<String>,
}

/// Streams archive entries into a directory tree
pub struct Extractor;

impl Extractor {
    /// Open the zip archive at `archive_path` and extract it into `dest_root`
    pub fn extract_file(
        archive_path: &Path,
        dest_root: &Path,
        progress: &ProgressManager,
    ) -> Result<ExtractionSummary, OptimizeError> {
        let file = File::open(archive_path)?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|source| {
            OptimizeError::ArchiveOpen {
                path: archive_path.to_path_buf(),
                source,
            }
        })?;

        info!(
            "Extracting {} ({} entries) into {}",
            archive_path.display(),
            archive.len(),
            dest_root.display()
        );
        Self::extract_archive(archive, dest_root, progress)
    }

    /// Extract every entry of a zip stream into `dest_root`
    pub fn extract<R: Read + Seek>(
        reader: R,
        dest_root: &Path,
        progress: &ProgressManager,
    ) -> Result<ExtractionSummary, OptimizeError> {
        let archive = ZipArchive::new(reader)?;
        Self::extract_archive(archive, dest_root, progress)
    }

    fn extract_archive<R: Read + Seek>(
        mut archive: ZipArchive<R>,
        dest_root: &Path,
        progress: &ProgressManager,
    ) -> Result<ExtractionSummary, OptimizeError> {
        let mut summary = ExtractionSummary::default();
        progress.set_length(archive.len() as u64);

        for index in 0..archive.len() {
            let name = archive
                .name_for_index(index)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{index}"));

            match Self::extract_entry(&mut archive, index, dest_root, &mut summary) {
                Ok(()) => {}
                Err(err) if err.is_recoverable_entry_error() => {
                    warn!("Skipping unreadable entry {}: {}", name, err);
                    summary.skipped.push(name.clone());
                }
                Err(err) => return Err(err),
            }

            progress.update(&name);
        }

        debug!(
            "Extracted {} files and {} directories, skipped {}",
            summary.files,
            summary.directories,
            summary.skipped.len()
        );
        Ok(summary)
    }

    fn extract_entry<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        index: usize,
        dest_root: &Path,
        summary: &mut ExtractionSummary,
    ) -> Result<(), OptimizeError> {
        let mut entry = archive.by_index(index)?;
        let out_path = resolve_entry_path(dest_root, entry.name())?;

        if entry.is_dir() {
            create_dir(&out_path)?;
            summary.directories += 1;
            if let Some(dir) = ArchiveEntry::from_tree(dest_root, &out_path, true) {
                summary.directory_entries.push(dir.name);
            }
            return Ok(());
        }

        if let Some(parent) = out_path.parent() {
            create_dir(parent)?;
        }

        let mut out = File::create(&out_path)?;
        let written = io::copy(&mut entry, &mut out)?;
        summary.files += 1;
        summary.bytes_extracted += written;
        debug!("Extracted {} ({} bytes)", entry.name(), written);
        Ok(())
    }
}

fn create_dir(path: &Path) -> Result<(), OptimizeError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| OptimizeError::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    })
}
