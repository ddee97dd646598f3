use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by the generation engine.
#[derive(Debug, Error)]
pub enum GenError {
    /// Reading or writing a file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file could not be parsed into the structural model.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The schema module does not describe a usable entity.
    #[error("invalid schema for '{entity}': {message}")]
    Schema { entity: String, message: String },

    /// The persisted snapshot file is unreadable or malformed.
    #[error("snapshot error: {message}")]
    Snapshot { message: String },

    /// A generator plugin refused to emit code for an entity.
    #[error("plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    /// An edit produced text the structural model can no longer locate.
    #[error("structural edit failed in {}: {message}", path.display())]
    Edit { path: PathBuf, message: String },
}

impl GenError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, err: &syn::Error) -> Self {
        let start = err.span().start();
        Self::Parse {
            path: path.into(),
            message: format!("{err} (line {}, column {})", start.line, start.column + 1),
        }
    }

    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the engine.
pub type GenResult<T> = Result<T, GenError>;
