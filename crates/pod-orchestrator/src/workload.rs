//! Translation of a [`PodSpec`] into a Kubernetes `apps/v1` Deployment.
//!
//! Everything here is pure: no client, no logging, no failure path.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec as K8sPodSpec, PodTemplateSpec,
    ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use crate::model::{EnvSpec, PodSpec, PortSpec};
use crate::storage::labels::{LABEL_APP_NAME, LABEL_MANAGED_BY, LABEL_MANAGED_BY_VALUE};

/// Kubernetes reads a bare number as the base unit of the resource.
/// Always six fractional digits, no suffix.
pub fn quantity(value: f32) -> Quantity {
    Quantity(format!("{:.6}", f64::from(value)))
}

pub fn port_name(container_port: i32) -> String {
    format!("port-{}", container_port)
}

fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(LABEL_APP_NAME.to_string(), name.to_string())])
}

pub fn build_deployment(spec: &PodSpec) -> Deployment {
    let mut labels = selector_labels(&spec.name);
    labels.insert(
        LABEL_MANAGED_BY.to_string(),
        LABEL_MANAGED_BY_VALUE.to_string(),
    );

    Deployment {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&spec.name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels(&spec.name)),
                    ..Default::default()
                }),
                spec: Some(K8sPodSpec {
                    containers: vec![build_container(spec)],
                    restart_policy: Some(spec.restart_policy.as_str().to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_container(spec: &PodSpec) -> Container {
    let ports = container_ports(&spec.ports);
    let env = env_vars(&spec.envs);

    Container {
        name: spec.name.clone(),
        image: Some(spec.image.clone()),
        image_pull_policy: Some(spec.pull_policy.as_str().to_string()),
        ports: if ports.is_empty() { None } else { Some(ports) },
        env: if env.is_empty() { None } else { Some(env) },
        resources: Some(resource_requirements(spec)),
        ..Default::default()
    }
}

fn container_ports(ports: &[PortSpec]) -> Vec<ContainerPort> {
    ports
        .iter()
        .map(|p| ContainerPort {
            name: Some(port_name(p.container_port)),
            container_port: p.container_port,
            protocol: Some(p.protocol.as_str().to_string()),
            ..Default::default()
        })
        .collect()
}

fn env_vars(envs: &[EnvSpec]) -> Vec<EnvVar> {
    envs.iter()
        .map(|e| EnvVar {
            name: e.key.clone(),
            value: Some(e.value.clone()),
            ..Default::default()
        })
        .collect()
}

fn resource_requirements(spec: &PodSpec) -> ResourceRequirements {
    ResourceRequirements {
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), quantity(spec.cpu_max)),
            ("memory".to_string(), quantity(spec.memory_max)),
        ])),
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), quantity(spec.cpu_min)),
            ("memory".to_string(), quantity(spec.memory_min)),
        ])),
        ..Default::default()
    }
}
