use std::path::PathBuf;

use kube::config::{InClusterError, KubeconfigError};
use thiserror::Error;

/// Failures while resolving credentials or talking to the API server
///
/// All of these end the run.
#[derive(Debug, Error)]
pub enum Error {
    /// kube's message already names the path and the io error
    #[error("{cause}")]
    ReadKubeconfig { path: PathBuf, cause: KubeconfigError },

    #[error("no Kubernetes configuration found: no kubeconfig available and not running inside a cluster")]
    NoConfiguration {
        #[source]
        source: Option<InClusterError>,
    },

    #[error("failed to load REST config")]
    LoadConfig(#[source] KubeconfigError),

    #[error("missing required value: {0}")]
    MissingField(&'static str),

    #[error("failed to read interactive input")]
    Prompt(#[source] std::io::Error),

    #[error("failed to build Kubernetes client")]
    BuildClient(#[source] kube::Error),

    #[error("failed to list pods in namespace {namespace}")]
    ListPods {
        namespace: String,
        #[source]
        source: kube::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::config::Kubeconfig;

    /// Render the error and its sources the way `anyhow`'s `{:#}` does
    fn chain(err: &dyn std::error::Error) -> String {
        let mut rendered = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            rendered.push_str(&format!(": {}", cause));
            source = cause.source();
        }
        rendered
    }

    #[test]
    fn test_read_kubeconfig_reports_path_and_cause_once() {
        let path = PathBuf::from("/nonexistent/kubeconfig");
        let cause = Kubeconfig::read_from(&path).unwrap_err();
        let err = Error::ReadKubeconfig { path, cause };

        let rendered = chain(&err);

        assert_eq!(rendered.matches("/nonexistent/kubeconfig").count(), 1, "{rendered}");
        assert_eq!(rendered.matches("os error").count(), 1, "{rendered}");
    }
}
