//! Core types and pipelines for runsheet: ingesting a day's delivery run,
//! rendering announcements from it, and sequencing driver stops.

/// Restaurant catalog loaded alongside a run file.
pub mod catalog;
/// Clock-time parsing and formatting shared by every layer.
pub mod clock;
/// Control block directives and their audits.
pub mod control;
/// Grid ingestion: row state machine, field validation, cross-row audits.
pub mod ingest;
/// Domain models shared by ingestion, templating and routing.
pub mod model;
/// Traits describing the geocoding / travel-time provider.
pub mod ports;
/// Stop sequencing and driver block rewriting.
pub mod route;
/// Per-generation specialisation tables.
pub mod schema;
/// High-level service facade used by clients.
pub mod service;
/// Announcement template parser and evaluator.
pub mod template;

pub use catalog::{CatalogError, RestaurantCatalog};
pub use control::ControlBlock;
pub use ingest::{Grid, IngestError, parse};
pub use model::*;
pub use ports::*;
pub use schema::SchemaVersion;
pub use service::*;
pub use template::{Template, TemplateError};
