use kube::Client;
use tracing::debug;

use crate::error::Error;
use crate::loader::ResolvedConfig;

/// Create a kube::Client bound to the resolved connection parameters
pub fn build_client(resolved: &ResolvedConfig) -> Result<Client, Error> {
    debug!(
        server = %resolved.config.cluster_url,
        source = ?resolved.source,
        "building Kubernetes client"
    );
    Client::try_from(resolved.config.clone()).map_err(Error::BuildClient)
}
