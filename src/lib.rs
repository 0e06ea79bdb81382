// ABOUTME: Main library module for the viewset template composition layer
// ABOUTME: Exports the loader, set, view, and helper APIs

pub mod config;
pub mod error;
pub mod helpers;
pub mod loader;
pub mod set;
pub mod view;

mod assemble;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use helpers::FuncMap;
pub use loader::{Loader, Source};
pub use set::{Set, SourceRef};
pub use view::View;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
