//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione dell'ottimizzatore.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di ottimizzazione
//! - Fornisce validazione dei parametri di input
//! - Supporta il caricamento della configurazione da file JSON
//! - Risolve il file di configurazione di default dell'utente
//!
//! ## Parametri di configurazione:
//! - `max_dimension`: Soglia in pixel per larghezza e altezza (default: 800)
//! - `json_output`: Emette eventi JSON su stdout invece delle progress bar
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     max_dimension: 1024,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default pixel threshold for both width and height
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

/// Largest threshold accepted; image codecs cap sides at `u16` range anyway
pub const MAX_ALLOWED_DIMENSION: u32 = 65_535;

/// Configuration for document optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum width and height of images under `Pictures/`
    pub max_dimension: u32,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 || self.max_dimension > MAX_ALLOWED_DIMENSION {
            return Err(anyhow::anyhow!(
                "Max size must be between 1 and {}",
                MAX_ALLOWED_DIMENSION
            ));
        }

        Ok(())
    }

    /// Load configuration from file, falling back to defaults when it does not exist
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    #[cfg(test)]
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Per-user configuration file, e.g. `~/.config/office-image-optimizer/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("office-image-optimizer").join("config.json"))
    }
}
