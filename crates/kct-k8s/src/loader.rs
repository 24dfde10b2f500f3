//! Resolution of cluster connection parameters

use std::path::PathBuf;

use kube::Config;
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::{debug, info};

use crate::error::Error;
use crate::overrides::{KubeOverrides, auth_entry, cluster_entry};
use crate::prompt::Prompter;

/// Where the connection parameters came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    /// The kubeconfig named on the command line
    ExplicitKubeconfig(PathBuf),
    /// `$KUBECONFIG` or `$HOME/.kube/config`
    DefaultKubeconfig,
    /// Override flags alone
    Overrides,
    /// The pod's service account
    InCluster,
    /// Override flags plus answers typed at the prompt
    Interactive,
}

/// Connection descriptor ready for the client factory
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub config: Config,
    /// Namespace the probe runs against
    pub namespace: String,
    pub source: ConfigSource,
}

/// Resolves a [`kube::Config`] from kubeconfig files, overrides, the
/// in-cluster environment or a prompt
///
/// Lookup order without an explicit path: default kubeconfig chain, then
/// overrides alone when they name a server, then in-cluster, then the prompt
/// when interactive.
pub struct CredentialLoader {
    kubeconfig_path: Option<PathBuf>,
    overrides: KubeOverrides,
    prompter: Option<Box<dyn Prompter>>,
    /// Consult the default kubeconfig chain and the in-cluster environment
    discover: bool,
}

impl CredentialLoader {
    pub fn new(kubeconfig_path: Option<PathBuf>, overrides: KubeOverrides) -> Self {
        Self {
            kubeconfig_path,
            overrides,
            prompter: None,
            discover: true,
        }
    }

    /// Ask for missing server and credentials instead of failing
    pub fn interactive(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub async fn resolve(mut self) -> Result<ResolvedConfig, Error> {
        let (mut kubeconfig, source) = match self.load_kubeconfig()? {
            Some(found) => found,
            None if self.overrides.server.is_some() => {
                debug!("no kubeconfig found, using override flags");
                (Kubeconfig::default(), ConfigSource::Overrides)
            }
            None => {
                let in_cluster_error = if self.discover {
                    match Config::incluster() {
                        Ok(config) => {
                            info!("using in-cluster configuration");
                            return Ok(self.finish(config, ConfigSource::InCluster));
                        }
                        Err(e) => {
                            debug!(error = %e, "in-cluster configuration unavailable");
                            Some(e)
                        }
                    }
                } else {
                    None
                };

                if self.prompter.is_none() {
                    return Err(Error::NoConfiguration {
                        source: in_cluster_error,
                    });
                }
                (Kubeconfig::default(), ConfigSource::Interactive)
            }
        };

        let options = self.overrides.apply(&mut kubeconfig);
        if let Some(prompter) = self.prompter.as_deref_mut() {
            fill_missing(&mut kubeconfig, &options, prompter)?;
        }

        let config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(Error::LoadConfig)?;

        Ok(self.finish(config, source))
    }

    fn load_kubeconfig(&self) -> Result<Option<(Kubeconfig, ConfigSource)>, Error> {
        if let Some(path) = &self.kubeconfig_path {
            info!(file = %path.display(), "using specified kube config file");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|cause| Error::ReadKubeconfig {
                path: path.clone(),
                cause,
            })?;
            return Ok(Some((
                kubeconfig,
                ConfigSource::ExplicitKubeconfig(path.clone()),
            )));
        }

        if !self.discover {
            return Ok(None);
        }

        match Kubeconfig::read() {
            Ok(kubeconfig) => Ok(Some((kubeconfig, ConfigSource::DefaultKubeconfig))),
            Err(e) => {
                debug!(error = %e, "no default kubeconfig");
                Ok(None)
            }
        }
    }

    /// Settings that apply whatever the source
    fn finish(&self, mut config: Config, source: ConfigSource) -> ResolvedConfig {
        if let Some(namespace) = &self.overrides.namespace {
            config.default_namespace = namespace.clone();
        }
        match self.overrides.request_timeout {
            Some(timeout) if timeout.is_zero() => config.read_timeout = None,
            Some(timeout) => config.read_timeout = Some(timeout),
            None => {}
        }
        if source == ConfigSource::InCluster {
            self.override_service_account(&mut config);
        }

        ResolvedConfig {
            namespace: config.default_namespace.clone(),
            config,
            source,
        }
    }

    /// The in-cluster config bypasses kubeconfig patching, so the token
    /// override is applied to it directly
    fn override_service_account(&self, config: &mut Config) {
        if let Some(token) = &self.overrides.token {
            config.auth_info.token = Some(token.clone().into());
            config.auth_info.token_file = None;
        }
    }
}

/// Prompt for a cluster server URL and user credentials the selected context
/// lacks
fn fill_missing(
    kubeconfig: &mut Kubeconfig,
    options: &KubeConfigOptions,
    prompter: &mut dyn Prompter,
) -> Result<(), Error> {
    let Some(context_name) = options.context.as_deref() else {
        return Ok(());
    };
    let Some(context) = kubeconfig
        .contexts
        .iter_mut()
        .find(|c| c.name == context_name)
        .and_then(|c| c.context.as_mut())
    else {
        return Ok(());
    };
    let user_name = context
        .user
        .get_or_insert_with(|| context_name.to_string())
        .clone();
    let cluster_name = context.cluster.clone();

    let cluster = cluster_entry(kubeconfig, &cluster_name);
    if cluster.server.as_deref().is_none_or(str::is_empty) {
        let server = prompter
            .prompt("Kubernetes API server URL")
            .map_err(Error::Prompt)?
            .ok_or(Error::MissingField("server"))?;
        cluster.server = Some(server);
    }

    let auth = auth_entry(kubeconfig, &user_name);
    let has_credentials = auth.token.is_some()
        || auth.token_file.is_some()
        || auth.username.is_some()
        || auth.client_certificate.is_some()
        || auth.client_certificate_data.is_some()
        || auth.exec.is_some()
        || auth.auth_provider.is_some();
    if !has_credentials {
        // A blank answer leaves the request anonymous
        if let Some(token) = prompter.prompt("Bearer token").map_err(Error::Prompt)? {
            auth.token = Some(token.into());
        }
    }

    Ok(())
}
