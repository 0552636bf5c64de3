//! `mapas-recon`: delivery map reconciliation and triage engine.
//!
//! Pure engine crate: receives decoded CSV text per logical source, returns
//! one reconciled record per delivery map plus triage counts. No CLI or IO
//! dependencies.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod table;

pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use filter::filter_maps;
pub use model::{AggregateResult, Category, InvoiceCategory, MapRecord, ReconInput, SourceKind};
