//! Kubernetes access for kube-client-template
//!
//! Resolves connection parameters from kubeconfig files, command-line
//! overrides, in-cluster service accounts or interactive input, builds the
//! API client and runs the pod listing probe.

mod client;
mod error;
mod loader;
mod overrides;
mod probe;
mod prompt;

pub use client::build_client;
pub use error::Error;
pub use loader::{ConfigSource, CredentialLoader, ResolvedConfig};
pub use overrides::{KubeOverrides, parse_timeout};
pub use probe::{list_pods, pod_info};
pub use prompt::{Prompter, StdioPrompter};

// Re-export types that are used in our public API
pub use kct_types::{ContainerInfo, PodInfo, PodStatus};
