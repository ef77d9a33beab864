//! Deployment configuration (teacher's `config::app`/`config::database`
//! split) plus the declarative goals/template document loader from
//! spec.md §6.

pub mod app;
pub mod document;

pub use app::AppConfig;
pub use document::{load, load_str};
