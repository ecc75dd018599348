//! # Office Image Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (file JSON + override da CLI)
//! - Avvio della pipeline su un thread bloccante del runtime
//!
//! ## Flusso di esecuzione:
//! 1. Nessun argomento: stampa l'help ed esce senza errore
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Risolve il file di output (`<stem>_optimized.<ext>` se assente)
//! 4. Crea il `DocumentOptimizer` ed esegue la run
//!
//! ## Esempio di utilizzo:
//! ```bash
//! office-image-optimizer report.odt
//! office-image-optimizer report.odt report_small.odt --max-size 1024
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use office_image_optimizer::file_manager::FileManager;
use office_image_optimizer::json_output::JsonMessage;
use office_image_optimizer::{Config, DocumentOptimizer};

#[derive(Parser)]
#[command(name = "office-image-optimizer")]
#[command(about = "Reduce the size of images embedded in Libre- or OpenOffice documents")]
#[command(after_help = "Examples:\n  office-image-optimizer myDocument.odp\n  office-image-optimizer myDocument.odp myDocument_small.odp")]
struct Args {
    /// Document to optimize
    in_file: Option<PathBuf>,

    /// Where to write the result (default: <in-file-stem>_optimized.<in-file-ext>)
    out_file: Option<PathBuf>,

    /// Maximum width and height of embedded pictures, in pixels [default: 800]
    #[arg(short = 's', long = "max-size")]
    max_size: Option<u32>,

    /// JSON configuration file (default: user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output progress and status as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let Some(in_file) = args.in_file.clone() else {
        if std::env::args_os().len() > 1 {
            return Err(anyhow::anyhow!("No input file given"));
        }
        Args::command().print_help()?;
        println!();
        return Ok(());
    };

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args).await?;
    let json_output = config.json_output;

    let out_file = match args.out_file {
        Some(path) => path,
        None => FileManager::default_output_path(&in_file)?,
    };

    let optimizer = DocumentOptimizer::new(config)?;
    let result =
        tokio::task::spawn_blocking(move || optimizer.optimize_file(&in_file, &out_file)).await?;

    if let Err(err) = result {
        error!("{:#}", err);
        if json_output {
            JsonMessage::error(&err).emit();
        }
        std::process::exit(1);
    }

    Ok(())
}

/// File configuration first, then command line overrides
async fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref path) = args.config {
        if !path.is_file() {
            return Err(anyhow::anyhow!("Configuration file does not exist: {}", path.display()));
        }
    }

    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            Config::from_file(&path)
                .await
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(max_size) = args.max_size {
        config.max_dimension = max_size;
    }
    if args.json {
        config.json_output = true;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("office-image-optimizer").chain(args.iter().copied()))
    }

    async fn config_file(dir: &TempDir, content: &str) -> String {
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, content).await.unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_positional_files_and_max_size_forms() {
        let args = parse(&["report.odt", "small.odt", "-s", "1024"]).unwrap();
        assert_eq!(args.in_file, Some(PathBuf::from("report.odt")));
        assert_eq!(args.out_file, Some(PathBuf::from("small.odt")));
        assert_eq!(args.max_size, Some(1024));

        let args = parse(&["report.odt", "--max-size", "640"]).unwrap();
        assert_eq!(args.out_file, None);
        assert_eq!(args.max_size, Some(640));
    }

    #[test]
    fn test_non_integer_max_size_is_rejected() {
        assert!(parse(&["report.odt", "--max-size", "big"]).is_err());
        assert!(parse(&["report.odt", "-s", "-5"]).is_err());
    }

    #[tokio::test]
    async fn test_max_size_defaults_to_800() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir, "{}").await;
        let args = parse(&["report.odt", "--config", &path]).unwrap();

        let config = load_config(&args).await.unwrap();
        assert_eq!(config.max_dimension, 800);
        assert!(!config.json_output);
    }

    #[tokio::test]
    async fn test_command_line_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir, r#"{"max_dimension": 640}"#).await;

        let args = parse(&["report.odt", "--config", &path]).unwrap();
        assert_eq!(load_config(&args).await.unwrap().max_dimension, 640);

        let args = parse(&["report.odt", "--config", &path, "-s", "1024", "--json"]).unwrap();
        let config = load_config(&args).await.unwrap();
        assert_eq!(config.max_dimension, 1024);
        assert!(config.json_output);
    }

    #[tokio::test]
    async fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir, "{}").await;
        let args = parse(&["report.odt", "--config", &path, "-s", "0"]).unwrap();
        assert!(load_config(&args).await.is_err());

        let missing = dir.path().join("absent.json").display().to_string();
        let args = parse(&["report.odt", "--config", &missing]).unwrap();
        assert!(load_config(&args).await.is_err());
    }
}
