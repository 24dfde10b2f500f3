//! One invocation: merged options, credential resolution and the pod probe

use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use kct_config::{ConfigError, ResolvedSettings};
use kct_k8s::{
    CredentialLoader, KubeOverrides, StdioPrompter, build_client, list_pods, parse_timeout,
};
use kct_types::{LogFormat, LogLevel, OutputFormat};

use crate::cli::Args;
use crate::output;

/// Read-only view of flags, environment and settings file for one run
///
/// Each field takes the flag value, else the environment or settings file
/// value, else the built-in default.
#[derive(Debug)]
pub struct Invocation {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub interactive: bool,
    pub output: OutputFormat,
    pub kubeconfig: Option<PathBuf>,
    pub overrides: KubeOverrides,

    /// Settings file that was loaded
    pub settings_file: Option<PathBuf>,
    settings_error: Option<ConfigError>,
    /// Settings values that could not be used
    warnings: Vec<String>,
}

impl Invocation {
    pub fn new(args: Args, resolved: ResolvedSettings) -> Self {
        let ResolvedSettings {
            settings,
            source,
            error,
        } = resolved;
        let mut warnings = Vec::new();

        let log_level = args
            .log_level
            .or_else(|| parse_setting(settings.log_level.as_deref(), &mut warnings))
            .unwrap_or_default();
        let log_format = args
            .log_format
            .or_else(|| parse_setting(settings.log_format.as_deref(), &mut warnings))
            .unwrap_or_default();
        let output = args
            .output
            .or_else(|| parse_setting(settings.output.as_deref(), &mut warnings))
            .unwrap_or_default();

        let request_timeout = args.kube.request_timeout.or_else(|| {
            let value = settings.request_timeout.as_deref()?;
            parse_timeout(value)
                .map_err(|e| warnings.push(format!("request-timeout: {}", e)))
                .ok()
        });

        let kube = args.kube;
        let overrides = KubeOverrides {
            context: kube.context.or(settings.context),
            cluster: kube.cluster.or(settings.cluster),
            user: kube.user.or(settings.user),
            namespace: kube.namespace.or(settings.namespace),
            server: kube.server.or(settings.server),
            certificate_authority: kube.certificate_authority,
            insecure_skip_tls_verify: kube.insecure_skip_tls_verify.then_some(true),
            tls_server_name: kube.tls_server_name,
            token: kube.token,
            username: kube.username,
            password: kube.password,
            client_certificate: kube.client_certificate,
            client_key: kube.client_key,
            impersonate: kube.impersonate,
            impersonate_groups: kube.impersonate_groups,
            request_timeout,
        };

        Self {
            log_level,
            log_format,
            interactive: args.interactive || settings.interactive.unwrap_or(false),
            output,
            kubeconfig: kube.kubeconfig.or(settings.kubeconfig),
            overrides,
            settings_file: source,
            settings_error: error,
            warnings,
        }
    }

    /// Log how settings were resolved; call once logging is up
    pub fn report(&self) {
        if let Some(path) = &self.settings_file {
            info!(file = %path.display(), "using config file");
        }
        if let Some(e) = &self.settings_error {
            let cause = std::error::Error::source(e)
                .map(ToString::to_string)
                .unwrap_or_default();
            debug!(file = %e.path().display(), %cause, "ignoring unreadable config file");
        }
        for warning in &self.warnings {
            warn!("ignoring invalid setting {}", warning);
        }
    }
}

fn parse_setting<T>(value: Option<&str>, warnings: &mut Vec<String>) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warnings.push(e.to_string());
            None
        }
    }
}

/// Resolve credentials, build the client and run the probe
pub async fn run(invocation: &Invocation) -> Result<()> {
    let mut loader =
        CredentialLoader::new(invocation.kubeconfig.clone(), invocation.overrides.clone());
    if invocation.interactive {
        loader = loader.interactive(Box::new(StdioPrompter::stdio()));
    }

    let resolved = loader.resolve().await?;
    debug!(
        namespace = %resolved.namespace,
        source = ?resolved.source,
        "resolved client configuration"
    );

    let client = build_client(&resolved)?;

    let stdout = std::io::stdout();
    probe(client, &resolved.namespace, invocation.output, &mut stdout.lock()).await?;
    Ok(())
}

/// List the namespace's pods and write them to `out`
///
/// Returns the number of pods listed.
pub async fn probe<W: Write>(
    client: kube::Client,
    namespace: &str,
    format: OutputFormat,
    out: &mut W,
) -> Result<usize> {
    let pods = list_pods(client, namespace).await?;
    info!(%namespace, count = pods.items.len(), "returned pods");

    let rendered = output::render(&pods, format, namespace, Utc::now())?;
    out.write_all(rendered.as_bytes())
        .context("Failed to write pod list")?;
    out.flush().context("Failed to write pod list")?;

    Ok(pods.items.len())
}
