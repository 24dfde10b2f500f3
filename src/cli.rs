use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use kct_k8s::parse_timeout;
use kct_types::{LogFormat, LogLevel, OutputFormat};

/// kube-client-template - list the pods of a namespace to prove cluster access
#[derive(Parser, Debug)]
#[command(name = "kube-client-template")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (default is $HOME/.kube-client-template.yaml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Minimum log level: trace, debug, info, warn or error [default: info]
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log line format: text or json [default: text]
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Prompt for a missing API server address and credentials
    #[arg(short, long)]
    pub interactive: bool,

    /// Pod list format: table, wide, json or yaml [default: table]
    #[arg(short, long, value_name = "FORMAT")]
    pub output: Option<OutputFormat>,

    #[command(flatten)]
    pub kube: KubeFlags,
}

/// Kubernetes connection flags
///
/// Each takes precedence over the kubeconfig value for the same field.
/// Credential flags are hidden from help output.
#[derive(clap::Args, Debug, Default)]
pub struct KubeFlags {
    /// (optional) absolute path to the kubeconfig file
    #[arg(long = "kubernetes-config", visible_alias = "kubeconfig", value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// The name of the kubeconfig context to use
    #[arg(long = "kubernetes-context", visible_alias = "context", value_name = "NAME")]
    pub context: Option<String>,

    /// The name of the kubeconfig cluster to use
    #[arg(long = "kubernetes-cluster", visible_alias = "cluster", value_name = "NAME")]
    pub cluster: Option<String>,

    /// The name of the kubeconfig user to use
    #[arg(long = "kubernetes-user", visible_alias = "user", value_name = "NAME")]
    pub user: Option<String>,

    /// If present, the namespace scope for this request
    #[arg(
        short = 'n',
        long = "kubernetes-namespace",
        visible_alias = "namespace",
        value_name = "NAMESPACE"
    )]
    pub namespace: Option<String>,

    /// The address and port of the Kubernetes API server
    #[arg(
        short = 's',
        long = "kubernetes-server",
        visible_alias = "server",
        value_name = "URL"
    )]
    pub server: Option<String>,

    /// Path to a cert file for the certificate authority
    #[arg(long = "kubernetes-certificate-authority", hide = true)]
    pub certificate_authority: Option<String>,

    /// Skip server certificate verification
    #[arg(long = "kubernetes-insecure-skip-tls-verify", hide = true)]
    pub insecure_skip_tls_verify: bool,

    /// Server name to use for server certificate validation
    #[arg(long = "kubernetes-tls-server-name", hide = true)]
    pub tls_server_name: Option<String>,

    /// Bearer token for authentication to the API server
    #[arg(long = "kubernetes-token", hide = true)]
    pub token: Option<String>,

    /// Username for basic authentication to the API server
    #[arg(long = "kubernetes-username", hide = true)]
    pub username: Option<String>,

    /// Password for basic authentication to the API server
    #[arg(long = "kubernetes-password", hide = true)]
    pub password: Option<String>,

    /// Path to a client certificate file for TLS
    #[arg(long = "kubernetes-client-certificate", hide = true)]
    pub client_certificate: Option<String>,

    /// Path to a client key file for TLS
    #[arg(long = "kubernetes-client-key", hide = true)]
    pub client_key: Option<String>,

    /// Username to impersonate for the operation
    #[arg(long = "kubernetes-as", hide = true)]
    pub impersonate: Option<String>,

    /// Group to impersonate for the operation, repeatable
    #[arg(long = "kubernetes-as-group", hide = true)]
    pub impersonate_groups: Vec<String>,

    /// How long to wait for a server response, e.g. 30s or 1m; 0 waits forever
    #[arg(
        long = "kubernetes-request-timeout",
        value_name = "DURATION",
        value_parser = parse_timeout
    )]
    pub request_timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_prefixed_and_short_flags() {
        let args = Args::try_parse_from([
            "kube-client-template",
            "--kubernetes-config",
            "/tmp/kubeconfig",
            "-n",
            "team-a",
            "--kubernetes-request-timeout",
            "1m",
            "-i",
            "-o",
            "yaml",
        ])
        .unwrap();

        assert_eq!(args.kube.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(args.kube.namespace.as_deref(), Some("team-a"));
        assert_eq!(args.kube.request_timeout, Some(Duration::from_secs(60)));
        assert!(args.interactive);
        assert_eq!(args.output, Some(OutputFormat::Yaml));
    }

    #[test]
    fn test_unprefixed_aliases() {
        let args = Args::try_parse_from([
            "kube-client-template",
            "--kubeconfig",
            "/bad/path",
            "--namespace",
            "kube-system",
            "--context",
            "kind",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.kube.kubeconfig, Some(PathBuf::from("/bad/path")));
        assert_eq!(args.kube.namespace.as_deref(), Some("kube-system"));
        assert_eq!(args.kube.context.as_deref(), Some("kind"));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_credential_flags_hidden_from_help() {
        let help = Args::command().render_long_help().to_string();

        assert!(help.contains("--kubernetes-namespace"));
        assert!(!help.contains("--kubernetes-token"));
        assert!(!help.contains("--kubernetes-password"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Args::try_parse_from(["kube-client-template", "--log-level", "loud"]).is_err());
        for timeout in ["soon", "18446744073709551615s18446744073709551615s"] {
            let result = Args::try_parse_from([
                "kube-client-template",
                "--kubernetes-request-timeout",
                timeout,
            ]);
            assert!(result.is_err(), "accepted timeout {timeout}");
        }
    }
}
