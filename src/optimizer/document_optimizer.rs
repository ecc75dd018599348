//! # Document Optimizer
//!
//! Orchestratore principale: una run per documento, fasi strettamente
//! sequenziali sullo stesso working tree.
//!
//! ## Flusso di esecuzione:
//! 1. **Working tree**: directory temporanea univoca, rimossa a fine run
//! 2. **Estrazione**: l'archivio di input viene estratto nel working tree
//! 3. **Immagini**: le immagini in `Pictures/` oltre soglia vengono ridimensionate
//! 4. **Packing**: il working tree viene scritto in un file temporaneo accanto
//!    all'output e poi rinominato, così un errore non lascia output parziali
//!    con i permessi del file di input
//! 5. **Report**: dimensioni, riduzione e SHA-256 dell'archivio prodotto
//!
//! ## Error handling:
//! - Ogni errore fatale porta con sé fase e file coinvolto
//! - Nessun retry: ogni operazione viene tentata una sola volta
//! - Il working tree viene rimosso anche sui percorsi di errore

use crate::{
    archive::{ExtractionSummary, Extractor, PackSummary, Packer},
    config::Config,
    file_manager::FileManager,
    image_processor::{ImageOptimizer, OptimizationReport},
    json_output::{JsonConfig, JsonMessage},
    progress::ProgressManager,
    working_tree::WorkingTree,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::Permissions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span};

/// Everything a finished run reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub extraction: ExtractionSummary,
    pub optimization: OptimizationReport,
    pub pack: PackSummary,
    pub input_size: u64,
    pub output_size: u64,
    pub output_sha256: String,
    pub duration: Duration,
}

impl RunSummary {
    pub fn reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.input_size, self.output_size)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "{} -> {} | {} -> {} ({:.2}% smaller) | {}",
            self.input.display(),
            self.output.display(),
            FileManager::format_size(self.input_size),
            FileManager::format_size(self.output_size),
            self.reduction_percent(),
            self.optimization.stats.format_summary()
        )
    }
}

/// Runs the extract, optimize, pack pipeline for one document at a time
pub struct DocumentOptimizer {
    config: Config,
    quiet: bool,
    temp_root: Option<PathBuf>,
}

impl DocumentOptimizer {
    /// Create a new document optimizer instance
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            quiet: false,
            temp_root: None,
        })
    }

    /// Hide progress bars
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Create working trees under `dir` instead of the system temp directory
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Optimize `input` and write the result to `output`.
    ///
    /// `output` may equal `input`: the input is fully extracted before the
    /// output is replaced.
    pub fn optimize_file(&self, input: &Path, output: &Path) -> Result<RunSummary> {
        let span = info_span!("optimize", input = %input.display());
        let _enter = span.enter();
        let started = Instant::now();

        if !input.is_file() {
            return Err(anyhow::anyhow!("Input file does not exist: {}", input.display()));
        }

        let input_size = FileManager::get_file_size(input)?;
        let permissions = std::fs::metadata(input)
            .with_context(|| format!("Failed to read metadata of {}", input.display()))?
            .permissions();
        info!("Optimizing {} -> {}", input.display(), output.display());
        if self.config.json_output {
            JsonMessage::start(
                input.to_path_buf(),
                output.to_path_buf(),
                JsonConfig::from(&self.config),
            )
            .emit();
        }

        let tree = match &self.temp_root {
            Some(dir) => WorkingTree::create_in(dir)?,
            None => WorkingTree::create()?,
        };

        let quiet = self.quiet || self.config.json_output;

        let progress = ProgressManager::for_stage(0, "extract", quiet);
        let extraction = Extractor::extract_file(input, tree.path(), &progress)
            .with_context(|| format!("Failed to extract archive {}", input.display()))?;
        progress.finish(&format!("{} entries", extraction.files + extraction.directories));

        let progress = ProgressManager::for_stage(0, "images", quiet);
        let optimization = ImageOptimizer::from_config(&self.config)
            .optimize_archive(tree.path(), &progress)
            .with_context(|| format!("Failed to optimize images of {}", input.display()))?;
        progress.finish(&optimization.stats.format_summary());

        if self.config.json_output {
            for report in &optimization.images {
                JsonMessage::image_complete(report).emit();
            }
        }

        let progress = ProgressManager::for_stage(0, "pack", quiet);
        let packer = Packer::with_directory_entries(extraction.directory_entries.iter().cloned());
        let pack = write_archive(&packer, tree.path(), output, permissions, &progress)
            .with_context(|| format!("Failed to write archive {}", output.display()))?;
        progress.finish(&format!("{} entries", pack.files + pack.directories));

        tree.close()?;

        let summary = RunSummary {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            extraction,
            optimization,
            pack,
            input_size,
            output_size: FileManager::get_file_size(output)?,
            output_sha256: FileManager::sha256_file(output)?,
            duration: started.elapsed(),
        };

        info!("{}", summary.format_summary());
        if self.config.json_output {
            JsonMessage::complete(&summary).emit();
        }

        Ok(summary)
    }
}

/// Pack into a temp file beside `output`, then move it into place.
/// The temp file is created owner-only, so `permissions` are applied before the rename.
fn write_archive(
    packer: &Packer,
    root: &Path,
    output: &Path,
    permissions: Permissions,
    progress: &ProgressManager,
) -> Result<PackSummary> {
    let out_dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&out_dir)
        .with_context(|| format!("Failed to create temporary output in {}", out_dir.display()))?;
    let summary = packer.pack(root, tmp.as_file_mut(), progress)?;
    tmp.as_file()
        .set_permissions(permissions)
        .context("Failed to set permissions of temporary output")?;
    tmp.persist(output)
        .map_err(|err| err.error)
        .with_context(|| format!("Failed to move archive into place at {}", output.display()))?;

    debug!("Wrote {}", output.display());
    Ok(summary)
}
