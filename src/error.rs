//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline.
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O generici (lettura/scrittura file)
//! - `Image`: Decodifica o codifica di un'immagine fallita
//! - `Zip`: Errore del codec zip durante la lettura o la scrittura
//! - `ArchiveOpen`: L'archivio di input non è leggibile come zip (fatale)
//! - `DirectoryCreation`: Impossibile creare una directory nel working tree (fatale)
//! - `UnsafeEntryPath`: Entry il cui nome uscirebbe dalla root di estrazione
//! - `UnsupportedFormat`: Estensione che non identifica un formato raster
//! - `Validation`: Parametri di configurazione non validi
//!
//! ## Recupero locale:
//! Solo le entry illeggibili e quelle con path non sicuro vengono saltate
//! dall'extractor; tutte le altre categorie interrompono la run.

use std::path::PathBuf;

/// Custom error types for document optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error in {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to open archive {path}: {source}")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Entry path escapes the extraction root: {0}")]
    UnsafeEntryPath(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl OptimizeError {
    /// Whether the extractor may skip the entry that produced this error
    /// instead of aborting the whole run.
    pub fn is_recoverable_entry_error(&self) -> bool {
        matches!(
            self,
            OptimizeError::Zip(zip::result::ZipError::UnsupportedArchive(_))
                | OptimizeError::UnsafeEntryPath(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_entry_errors() {
        let unsupported = OptimizeError::Zip(zip::result::ZipError::UnsupportedArchive(
            "Compression method not supported",
        ));
        assert!(unsupported.is_recoverable_entry_error());
        assert!(OptimizeError::UnsafeEntryPath("../evil".to_string()).is_recoverable_entry_error());

        let dir = OptimizeError::DirectoryCreation {
            path: PathBuf::from("/nope"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!dir.is_recoverable_entry_error());
        assert!(!OptimizeError::Validation("bad".to_string()).is_recoverable_entry_error());
    }

    #[test]
    fn test_error_messages_carry_paths() {
        let err = OptimizeError::DirectoryCreation {
            path: PathBuf::from("/tmp/tree/Pictures"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/tree/Pictures"));
    }
}
