// ABOUTME: Error types for template loading, composition, and rendering
// ABOUTME: Defines the crate-wide Error enum and Result alias

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("template directory not found: {}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("template {0:?} not found")]
    SourceNotFound(String),

    #[error("syntax error in template {name:?}: {source}")]
    Syntax {
        name: String,
        #[source]
        source: handlebars::TemplateError,
    },

    #[error("redefinition of root template (in {0:?})")]
    DuplicateRoot(String),

    #[error("missing root template")]
    MissingRoot,

    #[error("missing template fragment(s): {}", .0.join(", "))]
    MissingFragments(Vec<String>),

    #[error("helper {helper:?} is not registered (referenced from template {fragment:?})")]
    UndefinedFunction { fragment: String, helper: String },

    #[error("failed to read template file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("render failed: {0}")]
    Execution(handlebars::RenderError),
}

impl From<handlebars::RenderError> for Error {
    // Unregistered helpers only surface during execution in handlebars, so the
    // render error is inspected to keep the error kind stable for callers.
    fn from(err: handlebars::RenderError) -> Self {
        if let Some(helper) = err
            .desc
            .strip_prefix("Helper not defined: ")
            .map(|name| name.trim_matches('"').to_string())
        {
            return Error::UndefinedFunction {
                fragment: err.template_name.clone().unwrap_or_default(),
                helper,
            };
        }
        Error::Execution(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
