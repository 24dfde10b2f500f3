//! Command-line overrides layered over kubeconfig values

use std::fmt;
use std::time::Duration;

use kube::config::{
    AuthInfo, Cluster, Context, KubeConfigOptions, Kubeconfig, NamedAuthInfo, NamedCluster,
    NamedContext,
};

/// Name given to the context, cluster and user synthesised when no
/// kubeconfig supplies one
pub(crate) const SYNTHETIC_NAME: &str = "kube-client-template";

/// Connection fields that take precedence over the kubeconfig
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KubeOverrides {
    pub context: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
    pub namespace: Option<String>,

    // Cluster
    pub server: Option<String>,
    pub certificate_authority: Option<String>,
    pub insecure_skip_tls_verify: Option<bool>,
    pub tls_server_name: Option<String>,

    // Auth
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_certificate: Option<String>,
    pub client_key: Option<String>,
    pub impersonate: Option<String>,
    pub impersonate_groups: Vec<String>,

    /// Per-request read timeout; zero removes the read timeout
    pub request_timeout: Option<Duration>,
}

impl fmt::Debug for KubeOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("KubeOverrides")
            .field("context", &self.context)
            .field("cluster", &self.cluster)
            .field("user", &self.user)
            .field("namespace", &self.namespace)
            .field("server", &self.server)
            .field("certificate_authority", &self.certificate_authority)
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .field("tls_server_name", &self.tls_server_name)
            .field("token", &redacted(&self.token))
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("client_certificate", &self.client_certificate)
            .field("client_key", &self.client_key)
            .field("impersonate", &self.impersonate)
            .field("impersonate_groups", &self.impersonate_groups)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl KubeOverrides {
    fn has_cluster_fields(&self) -> bool {
        self.server.is_some()
            || self.certificate_authority.is_some()
            || self.insecure_skip_tls_verify.is_some()
            || self.tls_server_name.is_some()
    }

    fn has_auth_fields(&self) -> bool {
        self.token.is_some()
            || self.username.is_some()
            || self.password.is_some()
            || self.client_certificate.is_some()
            || self.client_key.is_some()
            || self.impersonate.is_some()
            || !self.impersonate_groups.is_empty()
    }

    /// Patch `kubeconfig` in place and return the options selecting the
    /// patched context
    ///
    /// An empty kubeconfig gets a synthetic context so that overrides alone
    /// can describe a cluster. When no context can be determined at all the
    /// kubeconfig is left untouched and loading reports the problem.
    pub fn apply(&self, kubeconfig: &mut Kubeconfig) -> KubeConfigOptions {
        let mut options = KubeConfigOptions {
            context: self.context.clone(),
            cluster: self.cluster.clone(),
            user: self.user.clone(),
        };

        let context_name = match self
            .context
            .clone()
            .or_else(|| kubeconfig.current_context.clone())
        {
            Some(name) => name,
            None if kubeconfig.contexts.is_empty() => {
                kubeconfig.contexts.push(NamedContext {
                    name: SYNTHETIC_NAME.to_string(),
                    context: Some(Context {
                        cluster: SYNTHETIC_NAME.to_string(),
                        user: Some(SYNTHETIC_NAME.to_string()),
                        ..Default::default()
                    }),
                });
                kubeconfig.current_context = Some(SYNTHETIC_NAME.to_string());
                SYNTHETIC_NAME.to_string()
            }
            None => return options,
        };
        options.context = Some(context_name.clone());

        let Some(context) = kubeconfig
            .contexts
            .iter_mut()
            .find(|c| c.name == context_name)
            .and_then(|c| c.context.as_mut())
        else {
            return options;
        };

        if let Some(cluster) = &self.cluster {
            context.cluster = cluster.clone();
        }
        if let Some(user) = &self.user {
            context.user = Some(user.clone());
        }
        if let Some(namespace) = &self.namespace {
            context.namespace = Some(namespace.clone());
        }
        if context.user.is_none() && self.has_auth_fields() {
            context.user = Some(context_name.clone());
        }

        let cluster_name = context.cluster.clone();
        let user_name = context.user.clone();

        if self.has_cluster_fields() {
            self.patch_cluster(cluster_entry(kubeconfig, &cluster_name));
        }
        if let Some(user_name) = user_name.filter(|_| self.has_auth_fields()) {
            self.patch_auth(auth_entry(kubeconfig, &user_name));
        }

        options
    }

    fn patch_cluster(&self, cluster: &mut Cluster) {
        if let Some(server) = &self.server {
            cluster.server = Some(server.clone());
        }
        if let Some(ca) = &self.certificate_authority {
            cluster.certificate_authority = Some(ca.clone());
            cluster.certificate_authority_data = None;
        }
        if let Some(insecure) = self.insecure_skip_tls_verify {
            cluster.insecure_skip_tls_verify = Some(insecure);
            // A CA bundle and skip-verify are mutually exclusive
            if insecure {
                cluster.certificate_authority = None;
                cluster.certificate_authority_data = None;
            }
        }
        if let Some(name) = &self.tls_server_name {
            cluster.tls_server_name = Some(name.clone());
        }
    }

    fn patch_auth(&self, auth: &mut AuthInfo) {
        if let Some(token) = &self.token {
            auth.token = Some(token.clone().into());
            auth.token_file = None;
        }
        if let Some(username) = &self.username {
            auth.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            auth.password = Some(password.clone().into());
        }
        if let Some(cert) = &self.client_certificate {
            auth.client_certificate = Some(cert.clone());
            auth.client_certificate_data = None;
        }
        if let Some(key) = &self.client_key {
            auth.client_key = Some(key.clone());
            auth.client_key_data = None;
        }
        if let Some(user) = &self.impersonate {
            auth.impersonate = Some(user.clone());
        }
        if !self.impersonate_groups.is_empty() {
            auth.impersonate_groups = Some(self.impersonate_groups.clone());
        }
    }
}

/// Find the named cluster, inserting an empty one if missing
pub(crate) fn cluster_entry<'a>(kubeconfig: &'a mut Kubeconfig, name: &str) -> &'a mut Cluster {
    let index = match kubeconfig.clusters.iter().position(|c| c.name == name) {
        Some(index) => index,
        None => {
            kubeconfig.clusters.push(NamedCluster {
                name: name.to_string(),
                cluster: None,
            });
            kubeconfig.clusters.len() - 1
        }
    };
    kubeconfig.clusters[index]
        .cluster
        .get_or_insert_with(Cluster::default)
}

/// Find the named user, inserting an empty one if missing
pub(crate) fn auth_entry<'a>(kubeconfig: &'a mut Kubeconfig, name: &str) -> &'a mut AuthInfo {
    let index = match kubeconfig.auth_infos.iter().position(|a| a.name == name) {
        Some(index) => index,
        None => {
            kubeconfig.auth_infos.push(NamedAuthInfo {
                name: name.to_string(),
                auth_info: None,
            });
            kubeconfig.auth_infos.len() - 1
        }
    };
    kubeconfig.auth_infos[index]
        .auth_info
        .get_or_insert_with(AuthInfo::default)
}

/// Parse a request timeout such as `30s`, `1m30s`, `500ms` or `2h`
///
/// A bare number is taken as seconds. `0` means no timeout.
pub fn parse_timeout(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty timeout".to_string());
    }
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid timeout '{}'", value));
        }
        let amount: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid timeout '{}'", value))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let step = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(amount)),
            "s" => Some(Duration::from_secs(amount)),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "h" => amount.checked_mul(3600).map(Duration::from_secs),
            unit => return Err(format!("invalid timeout unit '{}' in '{}'", unit, value)),
        };
        total = step
            .and_then(|step| total.checked_add(step))
            .ok_or_else(|| format!("timeout too large: '{}'", value))?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
- name: dev-cluster
  cluster:
    server: https://dev.example.com:6443
    certificate-authority-data: Zm9v
- name: prod-cluster
  cluster:
    server: https://prod.example.com:6443
contexts:
- name: dev
  context:
    cluster: dev-cluster
    user: dev-user
    namespace: team-a
- name: prod
  context:
    cluster: prod-cluster
    user: prod-user
users:
- name: dev-user
  user:
    tokenFile: /var/run/token
- name: prod-user
  user:
    token: prod-token
"#;

    fn kubeconfig() -> Kubeconfig {
        Kubeconfig::from_yaml(KUBECONFIG).unwrap()
    }

    fn context<'a>(kubeconfig: &'a Kubeconfig, name: &str) -> &'a Context {
        kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.context.as_ref())
            .unwrap()
    }

    fn cluster<'a>(kubeconfig: &'a Kubeconfig, name: &str) -> &'a Cluster {
        kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.cluster.as_ref())
            .unwrap()
    }

    fn auth<'a>(kubeconfig: &'a Kubeconfig, name: &str) -> &'a AuthInfo {
        kubeconfig
            .auth_infos
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.auth_info.as_ref())
            .unwrap()
    }

    #[test]
    fn test_no_overrides_selects_current_context() {
        let mut kc = kubeconfig();
        let options = KubeOverrides::default().apply(&mut kc);

        assert_eq!(options.context.as_deref(), Some("dev"));
        assert_eq!(options.cluster, None);
        assert_eq!(options.user, None);
        assert_eq!(context(&kc, "dev").namespace.as_deref(), Some("team-a"));
    }

    #[test]
    fn test_namespace_override_wins() {
        let mut kc = kubeconfig();
        let overrides = KubeOverrides {
            namespace: Some("team-b".to_string()),
            ..Default::default()
        };
        overrides.apply(&mut kc);

        assert_eq!(context(&kc, "dev").namespace.as_deref(), Some("team-b"));
    }

    #[test]
    fn test_context_override_patches_that_context() {
        let mut kc = kubeconfig();
        let overrides = KubeOverrides {
            context: Some("prod".to_string()),
            server: Some("https://10.0.0.1:6443".to_string()),
            ..Default::default()
        };
        let options = overrides.apply(&mut kc);

        assert_eq!(options.context.as_deref(), Some("prod"));
        assert_eq!(
            cluster(&kc, "prod-cluster").server.as_deref(),
            Some("https://10.0.0.1:6443")
        );
        assert_eq!(
            cluster(&kc, "dev-cluster").server.as_deref(),
            Some("https://dev.example.com:6443")
        );
    }

    #[test]
    fn test_cluster_override_rebinds_context() {
        let mut kc = kubeconfig();
        let overrides = KubeOverrides {
            cluster: Some("prod-cluster".to_string()),
            ..Default::default()
        };
        let options = overrides.apply(&mut kc);

        assert_eq!(options.cluster.as_deref(), Some("prod-cluster"));
        assert_eq!(context(&kc, "dev").cluster, "prod-cluster");
    }

    #[test]
    fn test_insecure_clears_ca() {
        let mut kc = kubeconfig();
        let overrides = KubeOverrides {
            insecure_skip_tls_verify: Some(true),
            ..Default::default()
        };
        overrides.apply(&mut kc);

        let dev = cluster(&kc, "dev-cluster");
        assert_eq!(dev.insecure_skip_tls_verify, Some(true));
        assert_eq!(dev.certificate_authority_data, None);
    }

    #[test]
    fn test_token_override_replaces_token_file() {
        let mut kc = kubeconfig();
        let overrides = KubeOverrides {
            token: Some("override-token".to_string()),
            impersonate: Some("admin".to_string()),
            impersonate_groups: vec!["system:masters".to_string()],
            ..Default::default()
        };
        overrides.apply(&mut kc);

        let dev = auth(&kc, "dev-user");
        assert!(dev.token.is_some());
        assert_eq!(dev.token_file, None);
        assert_eq!(dev.impersonate.as_deref(), Some("admin"));
        assert_eq!(
            dev.impersonate_groups.as_deref(),
            Some(&["system:masters".to_string()][..])
        );
    }

    #[test]
    fn test_empty_kubeconfig_gets_synthetic_context() {
        let mut kc = Kubeconfig::default();
        let overrides = KubeOverrides {
            server: Some("https://10.0.0.1:6443".to_string()),
            token: Some("t".to_string()),
            namespace: Some("probe".to_string()),
            ..Default::default()
        };
        let options = overrides.apply(&mut kc);

        assert_eq!(options.context.as_deref(), Some(SYNTHETIC_NAME));
        assert_eq!(kc.current_context.as_deref(), Some(SYNTHETIC_NAME));
        assert_eq!(context(&kc, SYNTHETIC_NAME).namespace.as_deref(), Some("probe"));
        assert_eq!(
            cluster(&kc, SYNTHETIC_NAME).server.as_deref(),
            Some("https://10.0.0.1:6443")
        );
        assert!(auth(&kc, SYNTHETIC_NAME).token.is_some());
    }

    #[test]
    fn test_missing_current_context_left_for_loader() {
        let mut kc = kubeconfig();
        kc.current_context = None;
        let options = KubeOverrides::default().apply(&mut kc);

        assert_eq!(options.context, None);
        assert_eq!(kc.contexts.len(), 2);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let overrides = KubeOverrides {
            token: Some("very-secret".to_string()),
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", overrides);

        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("30"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_timeout("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_timeout("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_timeout("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_timeout("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_timeout("0"), Ok(Duration::ZERO));
        assert!(parse_timeout("").is_err());
        assert!(parse_timeout("soon").is_err());
        assert!(parse_timeout("10d").is_err());
    }

    #[test]
    fn test_parse_timeout_overflow_is_an_error() {
        let err = parse_timeout("18446744073709551615h").unwrap_err();
        assert!(err.contains("too large"));

        let err = parse_timeout("18446744073709551615s18446744073709551615s").unwrap_err();
        assert!(err.contains("too large"));

        assert!(parse_timeout("99999999999999999999s").is_err());
    }
}
