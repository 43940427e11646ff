use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    Api, Client, ResourceExt,
    api::{DeleteParams, PostParams},
};

use crate::error::AppError;

/// Namespaced create/update/delete of the workload object.
///
/// One remote call per method. Errors are returned as the client produced
/// them, the caller decides what they mean.
#[async_trait]
pub trait WorkloadGateway: Send + Sync {
    async fn create(&self, deployment: &Deployment) -> Result<(), AppError>;

    async fn update(&self, deployment: &Deployment) -> Result<(), AppError>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct DeploymentStore {
    client: Client,
}

impl DeploymentStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn namespace_of(deployment: &Deployment) -> Result<String, AppError> {
    deployment.namespace().ok_or_else(|| {
        AppError::Internal(format!(
            "Deployment {} has no namespace",
            deployment.name_any()
        ))
    })
}

#[async_trait]
impl WorkloadGateway for DeploymentStore {
    async fn create(&self, deployment: &Deployment) -> Result<(), AppError> {
        let namespace = namespace_of(deployment)?;
        self.api(&namespace)
            .create(&PostParams::default(), deployment)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn update(&self, deployment: &Deployment) -> Result<(), AppError> {
        let namespace = namespace_of(deployment)?;
        // no resourceVersion: the api server applies it unconditionally
        self.api(&namespace)
            .replace(&deployment.name_any(), &PostParams::default(), deployment)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), AppError> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
