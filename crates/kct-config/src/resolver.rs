use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;
use crate::settings::Settings;

/// Settings file extensions, in lookup order
pub const EXTENSIONS: &[&str] = &["yaml", "yml", "toml", "json"];

/// Outcome of settings resolution
#[derive(Debug, Default)]
pub struct ResolvedSettings {
    /// Merged settings (file, then environment)
    pub settings: Settings,

    /// The file that was loaded, if any
    pub source: Option<PathBuf>,

    /// Why a located file could not be used
    pub error: Option<ConfigError>,
}

/// Locates and loads the optional settings file
#[derive(Clone, Debug)]
pub struct ConfigResolver {
    /// File stem without the leading dot, e.g. `kube-client-template`
    name: String,
    search_dirs: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigResolver {
    /// Create a resolver for `.<name>.<ext>` in the home directory, then the
    /// current working directory
    pub fn new(name: &str) -> Self {
        let mut search_dirs = Vec::new();
        if let Some(home) = dirs::home_dir() {
            search_dirs.push(home);
        }
        search_dirs.push(PathBuf::from("."));

        Self {
            name: name.to_string(),
            search_dirs,
            env_prefix: format!("{}_", name.to_ascii_uppercase().replace('-', "_")),
        }
    }

    /// Replace the directories searched when no explicit file is usable
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Prefix of environment variables overlaid onto the settings
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Find the settings file to load
    ///
    /// An explicit path is used when it exists; otherwise the search
    /// directories are tried in order.
    pub fn locate(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Some(path.to_path_buf());
            }
            debug!(path = %path.display(), "explicit settings file not found, searching defaults");
        }

        self.search_dirs.iter().find_map(|dir| {
            EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!(".{}.{}", self.name, ext)))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Locate, load and overlay the environment
    ///
    /// Never fails: a broken file yields default settings with the error
    /// recorded in [`ResolvedSettings::error`].
    pub fn resolve<I>(&self, explicit: Option<&Path>, env: I) -> ResolvedSettings
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut resolved = ResolvedSettings::default();

        if let Some(path) = self.locate(explicit) {
            match load_file(&path) {
                Ok(settings) => {
                    resolved.settings = settings;
                    resolved.source = Some(path);
                }
                Err(e) => resolved.error = Some(e),
            }
        }

        resolved.settings.overlay_env(&self.env_prefix, env);
        resolved
    }
}

/// Keep the environment variables whose name and value are both valid UTF-8
///
/// Feed `std::env::vars_os()` through this; `std::env::vars()` panics on the
/// first non-UTF-8 entry.
pub fn unicode_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

/// Parse a settings file, choosing the format from its extension
///
/// Unknown extensions are read as YAML.
pub fn load_file(path: &Path) -> Result<Settings, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        _ => serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NAME: &str = "kube-client-template";

    fn resolver(dirs: &[&TempDir]) -> ConfigResolver {
        let dirs = dirs.iter().map(|d| d.path().to_path_buf()).collect();
        ConfigResolver::new(NAME).with_search_dirs(dirs)
    }

    fn write(dir: &TempDir, file: &str, content: &str) -> PathBuf {
        let path = dir.path().join(file);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_env_prefix_from_name() {
        assert_eq!(ConfigResolver::new(NAME).env_prefix(), "KUBE_CLIENT_TEMPLATE_");
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "custom.yaml", "namespace: staging\n");

        let resolved = resolver(&[]).resolve(Some(&path), Vec::new());

        assert_eq!(resolved.source, Some(path));
        assert_eq!(resolved.settings.namespace.as_deref(), Some("staging"));
        assert!(resolved.error.is_none());
    }

    #[test]
    fn test_missing_explicit_file_falls_back_to_search() {
        let home = TempDir::new().unwrap();
        let found = write(&home, ".kube-client-template.yaml", "context: kind\n");
        let missing = home.path().join("missing.yaml");

        let resolved = resolver(&[&home]).resolve(Some(&missing), Vec::new());

        assert_eq!(resolved.source, Some(found));
        assert_eq!(resolved.settings.context.as_deref(), Some("kind"));
        assert!(resolved.error.is_none());
    }

    #[test]
    fn test_missing_everything_gives_defaults() {
        let empty = TempDir::new().unwrap();
        let missing = empty.path().join("missing.yaml");

        let resolved = resolver(&[&empty]).resolve(Some(&missing), Vec::new());

        assert_eq!(resolved.source, None);
        assert_eq!(resolved.settings, Settings::default());
        assert!(resolved.error.is_none());
    }

    #[test]
    fn test_home_searched_before_working_dir() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let in_home = write(&home, ".kube-client-template.toml", "namespace = \"home\"\n");
        write(&cwd, ".kube-client-template.yaml", "namespace: cwd\n");

        let resolved = resolver(&[&home, &cwd]).resolve(None, Vec::new());

        assert_eq!(resolved.source, Some(in_home));
        assert_eq!(resolved.settings.namespace.as_deref(), Some("home"));
    }

    #[test]
    fn test_json_settings() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".kube-client-template.json", r#"{"output": "json", "interactive": true}"#);

        let resolved = resolver(&[&dir]).resolve(None, Vec::new());

        assert_eq!(resolved.settings.output.as_deref(), Some("json"));
        assert_eq!(resolved.settings.interactive, Some(true));
    }

    #[test]
    fn test_parse_error_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, ".kube-client-template.yaml", "namespace: [unterminated\n");

        let env = vec![("KUBE_CLIENT_TEMPLATE_NAMESPACE".to_string(), "from-env".to_string())];
        let resolved = resolver(&[&dir]).resolve(None, env);

        assert_eq!(resolved.source, None);
        assert_eq!(resolved.error.as_ref().map(|e| e.path()), Some(path.as_path()));
        assert!(matches!(resolved.error, Some(ConfigError::Yaml { .. })));
        assert_eq!(resolved.settings.namespace.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_empty_file_is_valid() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, ".kube-client-template.yaml", "\n");

        let resolved = resolver(&[&dir]).resolve(None, Vec::new());

        assert_eq!(resolved.source, Some(path));
        assert_eq!(resolved.settings, Settings::default());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_environment_is_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let env = vec![
            (OsString::from("UNRELATED"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from_vec(b"KUBE_CLIENT_TEMPLATE_\xffUSER".to_vec()), OsString::from("x")),
            (OsString::from("KUBE_CLIENT_TEMPLATE_NAMESPACE"), OsString::from("from-env")),
        ];

        let resolved = resolver(&[]).resolve(None, unicode_vars(env));

        assert_eq!(resolved.settings.namespace.as_deref(), Some("from-env"));
        assert_eq!(resolved.settings.user, None);
        assert!(resolved.error.is_none());
    }
}
