use std::collections::BTreeMap;
use std::future::Future;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Container, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as K8sQuantity;
use kube::{api::ListParams, Api, Client};
use tracing::debug;

use crate::error::ObjectSourceError;
use crate::types::{ContainerSpec, DeclaredResources, Workload, WorkloadKind};

/// Read-only listing of the workloads whose containers get recommendations.
pub trait WorkloadSource {
    /// Deployments first, then StatefulSets, each in the order the API returned them.
    fn list_workloads(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<Workload>, ObjectSourceError>> + Send;
}

/// Lists `apps/v1` workloads through the Kubernetes API.
pub struct KubeWorkloadSource {
    client: Client,
}

impl KubeWorkloadSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl WorkloadSource for KubeWorkloadSource {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, ObjectSourceError> {
        let deployment_api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let deployments = deployment_api
            .list(&ListParams::default())
            .await
            .map_err(|e| ObjectSourceError::new("deployments", namespace, e))?;

        let statefulset_api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        let statefulsets = statefulset_api
            .list(&ListParams::default())
            .await
            .map_err(|e| ObjectSourceError::new("statefulsets", namespace, e))?;

        debug!(
            namespace,
            deployments = deployments.items.len(),
            statefulsets = statefulsets.items.len(),
            "listed workloads"
        );

        let workloads = deployments
            .items
            .iter()
            .filter_map(workload_from_deployment)
            .chain(statefulsets.items.iter().filter_map(workload_from_statefulset))
            .collect();
        Ok(workloads)
    }
}

pub fn workload_from_deployment(deployment: &Deployment) -> Option<Workload> {
    let name = deployment.metadata.name.clone()?;
    let template = deployment.spec.as_ref().map(|s| &s.template);
    Some(workload_from_template(WorkloadKind::Deployment, name, template))
}

pub fn workload_from_statefulset(statefulset: &StatefulSet) -> Option<Workload> {
    let name = statefulset.metadata.name.clone()?;
    let template = statefulset.spec.as_ref().map(|s| &s.template);
    Some(workload_from_template(WorkloadKind::StatefulSet, name, template))
}

fn workload_from_template(kind: WorkloadKind, name: String, template: Option<&PodTemplateSpec>) -> Workload {
    let pod_spec = template.and_then(|t| t.spec.as_ref());
    let init_containers = pod_spec
        .and_then(|s| s.init_containers.as_ref())
        .map(|cs| cs.iter().map(container_spec).collect())
        .unwrap_or_default();
    let containers = pod_spec
        .map(|s| s.containers.iter().map(container_spec).collect())
        .unwrap_or_default();

    Workload {
        kind,
        name,
        init_containers,
        containers,
    }
}

fn container_spec(container: &Container) -> ContainerSpec {
    let resources = container.resources.as_ref();
    ContainerSpec {
        name: container.name.clone(),
        requests: declared(resources.and_then(|r| r.requests.as_ref())),
        limits: declared(resources.and_then(|r| r.limits.as_ref())),
    }
}

fn declared(values: Option<&BTreeMap<String, K8sQuantity>>) -> DeclaredResources {
    let get = |key: &str| values.and_then(|v| v.get(key)).map(|q| q.0.clone());
    DeclaredResources {
        cpu: get("cpu"),
        memory: get("memory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, StatefulSetSpec};
    use k8s_openapi::api::core::v1::{PodSpec, ResourceRequirements};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn create_test_container(name: &str, cpu: Option<&str>, memory: Option<&str>) -> Container {
        let mut requests = BTreeMap::new();
        if let Some(cpu) = cpu {
            requests.insert("cpu".to_string(), K8sQuantity(cpu.to_string()));
        }
        if let Some(memory) = memory {
            requests.insert("memory".to_string(), K8sQuantity(memory.to_string()));
        }
        Container {
            name: name.to_string(),
            resources: Some(ResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn create_test_template(init: Vec<Container>, containers: Vec<Container>) -> PodTemplateSpec {
        PodTemplateSpec {
            spec: Some(PodSpec {
                init_containers: if init.is_empty() { None } else { Some(init) },
                containers,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_workload_from_deployment() {
        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                template: create_test_template(
                    vec![create_test_container("migrate", None, None)],
                    vec![
                        create_test_container("app", Some("250m"), Some("256Mi")),
                        create_test_container("sidecar", Some("10m"), None),
                    ],
                ),
                ..Default::default()
            }),
            ..Default::default()
        };

        let workload = workload_from_deployment(&deployment).unwrap();
        assert_eq!(workload.kind, WorkloadKind::Deployment);
        assert_eq!(workload.name, "web");
        assert_eq!(workload.init_containers.len(), 1);
        assert_eq!(workload.init_containers[0].name, "migrate");
        assert_eq!(workload.init_containers[0].requests, DeclaredResources::default());

        let names: Vec<_> = workload.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["app", "sidecar"]);
        assert_eq!(workload.containers[0].requests.cpu.as_deref(), Some("250m"));
        assert_eq!(workload.containers[0].requests.memory.as_deref(), Some("256Mi"));
        assert_eq!(workload.containers[0].limits, DeclaredResources::default());
        assert_eq!(workload.containers[1].requests.memory, None);
    }

    #[test]
    fn test_workload_from_statefulset() {
        let statefulset = StatefulSet {
            metadata: ObjectMeta {
                name: Some("db".to_string()),
                ..Default::default()
            },
            spec: Some(StatefulSetSpec {
                template: create_test_template(vec![], vec![create_test_container("postgres", Some("1"), Some("2Gi"))]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let workload = workload_from_statefulset(&statefulset).unwrap();
        assert_eq!(workload.kind, WorkloadKind::StatefulSet);
        assert!(workload.init_containers.is_empty());
        assert_eq!(workload.containers[0].requests.cpu.as_deref(), Some("1"));
    }

    #[test]
    fn test_unnamed_or_specless_workloads() {
        assert!(workload_from_deployment(&Deployment::default()).is_none());

        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some("empty".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let workload = workload_from_deployment(&deployment).unwrap();
        assert!(workload.containers.is_empty());
        assert!(workload.init_containers.is_empty());
    }
}
