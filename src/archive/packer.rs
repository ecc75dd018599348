//! # Packer
//!
//! Percorre ricorsivamente il working tree e scrive ogni file e directory in
//! un nuovo archivio zip, con path relativi alla root.
//!
//! ## Output deterministico:
//! - Entry ordinate lessicograficamente per path relativo
//! - `mimetype` in testa e non compresso (regola di packaging ODF)
//! - Timestamp fisso (1980-01-01) e permessi fissi su ogni entry
//!
//! La root stessa ha path relativo vuoto e non produce alcuna entry.
//!
//! ## Directory:
//! Di default ogni directory del tree riceve un marker `nome/`. Con
//! `with_directory_entries` vengono scritti solo i marker delle directory
//! elencate (quelle esplicite nell'archivio di input) e delle directory
//! vuote; le altre restano implicite nei path dei file.

use crate::archive::entry::ArchiveEntry;
use crate::error::OptimizeError;
use crate::progress::ProgressManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const FILE_PERMISSIONS: u32 = 0o644;
const DIR_PERMISSIONS: u32 = 0o755;

/// What a packing run wrote
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes_packed: u64,
}

/// Writes a directory tree into a zip archive.
/// The default packer writes a marker for every directory of the tree.
#[derive(Debug, Default, Clone)]
pub struct Packer {
    /// When set, only these directories and empty ones get a marker entry
    directory_entries: Option<BTreeSet<String>>,
}

impl Packer {
    /// Packer writing markers only for the listed directories (slash-separated,
    /// no trailing slash) and for directories with nothing inside
    pub fn with_directory_entries<I, S>(directories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            directory_entries: Some(directories.into_iter().map(Into::into).collect()),
        }
    }

    /// Every file and marked directory below `source_root`, in archive order
    pub fn collect_entries(&self, source_root: &Path) -> Result<Vec<ArchiveEntry>, OptimizeError> {
        let mut entries = Vec::new();

        for dir_entry in WalkDir::new(source_root) {
            let dir_entry = dir_entry.map_err(io::Error::from)?;
            let is_dir = dir_entry.file_type().is_dir();
            let Some(entry) = ArchiveEntry::from_tree(source_root, dir_entry.path(), is_dir) else {
                continue;
            };
            if entry.is_dir && !self.writes_marker(&entry)? {
                continue;
            }
            entries.push(entry);
        }

        entries.sort_by(|a, b| {
            b.is_mimetype()
                .cmp(&a.is_mimetype())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    fn writes_marker(&self, dir: &ArchiveEntry) -> Result<bool, OptimizeError> {
        match &self.directory_entries {
            None => Ok(true),
            Some(listed) if listed.contains(&dir.name) => Ok(true),
            // nothing below an empty directory would recreate it
            Some(_) => Ok(fs::read_dir(&dir.source)?.next().is_none()),
        }
    }

    /// Pack `source_root` into `writer`, finishing the archive and flushing it
    pub fn pack<W: Write + Seek>(
        &self,
        source_root: &Path,
        writer: W,
        progress: &ProgressManager,
    ) -> Result<PackSummary, OptimizeError> {
        let entries = self.collect_entries(source_root)?;
        info!(
            "Packing {} entries from {}",
            entries.len(),
            source_root.display()
        );
        progress.set_length(entries.len() as u64);

        let mut zip = ZipWriter::new(writer);
        let mut summary = PackSummary::default();

        for entry in &entries {
            if entry.is_dir {
                let options = entry_options().unix_permissions(DIR_PERMISSIONS);
                zip.add_directory(entry.name.as_str(), options)?;
                summary.directories += 1;
            } else {
                let size = entry.source.metadata()?.len();
                let method = if entry.is_mimetype() {
                    CompressionMethod::Stored
                } else {
                    CompressionMethod::Deflated
                };
                let options = entry_options()
                    .compression_method(method)
                    .unix_permissions(FILE_PERMISSIONS)
                    .large_file(size >= u64::from(u32::MAX));

                zip.start_file(entry.name.as_str(), options)?;
                let mut source = File::open(&entry.source)?;
                summary.bytes_packed += io::copy(&mut source, &mut zip)?;
                summary.files += 1;
            }

            debug!("Packed {}", entry.archive_name());
            progress.update(&entry.name);
        }

        let mut writer = zip.finish()?;
        writer.flush()?;

        debug!(
            "Packed {} files and {} directories ({} bytes)",
            summary.files, summary.directories, summary.bytes_packed
        );
        Ok(summary)
    }
}

/// Fixed timestamp so identical trees pack to identical bytes
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().last_modified_time(DateTime::default())
}
