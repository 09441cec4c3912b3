//! Domain types and the BOM / progress engines
//!
//! Everything here is pure: handlers load documents, call into these modules
//! and persist the result.

pub mod bom;
pub mod locations;
pub mod materials;
pub mod progress;
pub mod projects;
pub mod templates;

pub use bom::{BomError, BomParams, GeneratedBom};
pub use locations::Location;
pub use materials::Material;
pub use progress::ProgressError;
pub use projects::{Floor, Project, ProjectError, ProjectStatus, Task};
pub use templates::{Template, TemplateError};
