use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use tracing::trace;

/// Values that may come from a settings file or the environment
///
/// Every field is optional; anything left unset falls through to the
/// command-line default. Keys are kebab-case, matching the flag names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    #[serde(alias = "log_level")]
    pub log_level: Option<String>,

    #[serde(alias = "log_format")]
    pub log_format: Option<String>,

    pub interactive: Option<bool>,

    pub output: Option<String>,

    /// Path to a kubeconfig file
    pub kubeconfig: Option<PathBuf>,

    pub context: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
    pub namespace: Option<String>,
    pub server: Option<String>,

    /// Request timeout such as `30s`; bare numbers are seconds
    #[serde(alias = "request_timeout", deserialize_with = "string_or_number")]
    pub request_timeout: Option<String>,
}

impl Settings {
    /// Overlay environment variables named `<prefix><KEY>` onto these settings
    ///
    /// `KEY` is the upper snake case form of the setting key, so with the
    /// prefix `KUBE_CLIENT_TEMPLATE_` the variable for `log-level` is
    /// `KUBE_CLIENT_TEMPLATE_LOG_LEVEL`. Empty values are treated as unset.
    pub fn overlay_env<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(prefix) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let key = key.to_ascii_lowercase().replace('_', "-");
            if !self.set(&key, value) {
                trace!(variable = %name, "ignoring unrecognised environment variable");
            }
        }
    }

    /// Set a single setting by key. Returns false for unknown keys and
    /// unparsable booleans.
    pub fn set(&mut self, key: &str, value: String) -> bool {
        match key {
            "log-level" => self.log_level = Some(value),
            "log-format" => self.log_format = Some(value),
            "interactive" => match parse_bool(&value) {
                Some(b) => self.interactive = Some(b),
                None => return false,
            },
            "output" => self.output = Some(value),
            "kubeconfig" => self.kubeconfig = Some(PathBuf::from(value)),
            "context" => self.context = Some(value),
            "cluster" => self.cluster = Some(value),
            "user" => self.user = Some(value),
            "namespace" => self.namespace = Some(value),
            "server" => self.server = Some(value),
            "request-timeout" => self.request_timeout = Some(value),
            _ => return false,
        }
        true
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Int(n)) => Some(n.to_string()),
        Some(Raw::Float(n)) => Some(n.to_string()),
        None => None,
    })
}
