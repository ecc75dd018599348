//! # Archive Module
//!
//! Trascodifica dell'archivio: estrazione streaming nel working tree e
//! ri-archiviazione deterministica in zip.
//! - `extractor`: Legge le entry una alla volta e le scrive nel working tree
//! - `packer`: Percorre il working tree e scrive un nuovo archivio zip
//! - `entry`: Path relativi delle entry e regole di naming

pub mod entry;
pub mod extractor;
pub mod packer;

pub use entry::ArchiveEntry;
pub use extractor::{ExtractionSummary, Extractor};
pub use packer::{PackSummary, Packer};
