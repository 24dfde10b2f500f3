use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::{ListParams, ObjectList};
use tracing::debug;

use crate::error::Error;
use crate::{ContainerInfo, PodInfo, PodStatus};

/// Fetch all pods in a namespace with a single unfiltered list call
pub async fn list_pods(client: kube::Client, namespace: &str) -> Result<ObjectList<Pod>, Error> {
    debug!(%namespace, "running against namespace");

    let pods: Api<Pod> = Api::namespaced(client, namespace);
    pods.list(&ListParams::default())
        .await
        .map_err(|source| Error::ListPods {
            namespace: namespace.to_string(),
            source,
        })
}

/// Convert a k8s Pod to PodInfo
pub fn pod_info(pod: &Pod) -> PodInfo {
    let mut info = PodInfo::new(pod.metadata.name.clone().unwrap_or_default());

    info.created = pod.metadata.creation_timestamp.as_ref().map(|t| t.0);

    if let Some(spec) = &pod.spec {
        info.node_name = spec.node_name.clone();
    }

    if let Some(status) = &pod.status {
        info.pod_ip = status.pod_ip.clone();
        info.status = status
            .phase
            .as_deref()
            .map(PodStatus::from)
            .unwrap_or(PodStatus::Unknown);

        if let Some(container_statuses) = &status.container_statuses {
            info.containers = container_statuses
                .iter()
                .map(|cs| {
                    let mut container = ContainerInfo::new(cs.name.clone());
                    container.ready = cs.ready;
                    container.restart_count = cs.restart_count;
                    container
                })
                .collect();
        }
    }

    info
}
