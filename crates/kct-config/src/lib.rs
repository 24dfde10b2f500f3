//! Settings resolution for kube-client-template
//!
//! Locates an optional settings file (explicit path, then the home directory,
//! then the working directory), parses it according to its extension and
//! overlays matching environment variables.

mod error;
mod resolver;
mod settings;

pub use error::ConfigError;
pub use resolver::{ConfigResolver, EXTENSIONS, ResolvedSettings, load_file, unicode_vars};
pub use settings::Settings;
