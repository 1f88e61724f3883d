//! D-NAV Core — data model, extraction configuration, lexicon tables, text utilities.

pub mod config;
pub mod error;
pub mod lexicon;
pub mod text;
pub mod types;

pub use config::{ExtractionConfig, ExtractionMode};
pub use error::{Error, Result};
pub use lexicon::Lexicon;
pub use types::*;
