//! Source acquisition: finds the export files in a folder and decodes them
//! into a [`mapas_recon::ReconInput`].

pub mod decode;
pub mod discover;
pub mod error;

pub use decode::read_file_as_utf8;
pub use discover::{discover_sources, locate_sources};
pub use error::IoError;
