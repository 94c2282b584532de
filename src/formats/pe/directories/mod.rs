//! Data directory parsers

pub mod import;
pub mod resource;

pub use import::{parse_imports, ImportTable};
pub use resource::{parse_resources, ResourceSummary};
