//! Builders for the backing service's Deployment and Service.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HTTPGetAction, PodSpec, PodTemplateSpec, Probe, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Port the shortening service listens on.
pub const BACKEND_PORT: i32 = 8080;

const MANAGED_BY: &str = "shorturl-operator";

/// Identity and image of the backing shortening service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub name: String,
    pub namespace: String,
    pub image: String,
}

impl BackendSpec {
    /// Pod selector shared by the Deployment and the Service.
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("app".to_string(), self.name.clone())])
    }

    fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.selector_labels();
        labels.insert(
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY.to_string(),
        );
        labels
    }

    fn metadata(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels()),
            ..Default::default()
        }
    }

    /// Single-replica Deployment running the shortening service.
    pub fn deployment(&self) -> Deployment {
        let health_probe = Probe {
            http_get: Some(HTTPGetAction {
                path: Some("/health".to_string()),
                port: IntOrString::Int(BACKEND_PORT),
                ..Default::default()
            }),
            initial_delay_seconds: Some(2),
            period_seconds: Some(10),
            ..Default::default()
        };

        Deployment {
            metadata: self.metadata(),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(self.selector_labels()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(self.labels()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: self.name.clone(),
                            image: Some(self.image.clone()),
                            ports: Some(vec![ContainerPort {
                                container_port: BACKEND_PORT,
                                name: Some("http".to_string()),
                                protocol: Some("TCP".to_string()),
                                ..Default::default()
                            }]),
                            env: Some(vec![EnvVar {
                                name: "LISTEN".to_string(),
                                value: Some(format!("0.0.0.0:{BACKEND_PORT}")),
                                ..Default::default()
                            }]),
                            readiness_probe: Some(health_probe.clone()),
                            liveness_probe: Some(health_probe),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// ClusterIP Service in front of the Deployment's pods.
    pub fn service(&self) -> Service {
        Service {
            metadata: self.metadata(),
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".to_string()),
                selector: Some(self.selector_labels()),
                ports: Some(vec![ServicePort {
                    name: Some("http".to_string()),
                    port: BACKEND_PORT,
                    target_port: Some(IntOrString::Int(BACKEND_PORT)),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
