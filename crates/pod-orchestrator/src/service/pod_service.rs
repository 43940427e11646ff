use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::model::PodSpec;
use crate::storage::{PodRepository, WorkloadGateway};
use crate::workload::build_deployment;

/// What a delete managed to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Deployment and every durable row are gone.
    Deleted { rows: u64 },
    /// Deployment is gone, the durable rows are still there.
    WorkloadOnly { reason: String },
}

/// Sequences each pod operation across Kubernetes and the database.
///
/// Nothing is rolled back. When the second system fails after the first one
/// succeeded the divergence is logged and the error returned, except for
/// delete which reports [`DeleteOutcome::WorkloadOnly`].
#[derive(Clone)]
pub struct PodService {
    repository: Arc<dyn PodRepository>,
    workloads: Arc<dyn WorkloadGateway>,
}

impl PodService {
    pub fn new(repository: Arc<dyn PodRepository>, workloads: Arc<dyn WorkloadGateway>) -> Self {
        Self {
            repository,
            workloads,
        }
    }

    /// Creates the deployment and persists the spec, returning the new id.
    ///
    /// A create call that succeeds is read as "the deployment already
    /// exists" and fails the operation before anything is persisted. A create
    /// call that fails lets the operation continue to the database write.
    pub async fn add(&self, pod: PodSpec) -> Result<i64, AppError> {
        pod.validate()?;
        let deployment = build_deployment(&pod);

        match self.workloads.create(&deployment).await {
            Ok(()) => {
                warn!("Pod {}/{} already exists", pod.namespace, pod.name);
                return Err(AppError::Conflict(format!("Pod {} already exists", pod.name)));
            }
            Err(err) => {
                debug!(
                    "Create deployment {}/{} returned {}, continuing",
                    pod.namespace, pod.name, err
                );
            }
        }

        let id = self.repository.create(&pod).await.inspect_err(|err| {
            error!(
                "Pod {}/{} reached the cluster step but was not persisted: {}",
                pod.namespace, pod.name, err
            );
        })?;

        info!("Added pod {}/{} with id {}", pod.namespace, pod.name, id);
        Ok(id)
    }

    pub async fn update(&self, pod: PodSpec) -> Result<(), AppError> {
        pod.validate()?;
        let id = pod.id_or_invalid()?;
        let stored = self.find_by_id(id).await?;
        pod.ensure_same_identity(&stored)?;
        let deployment = build_deployment(&pod);

        self.workloads.update(&deployment).await.inspect_err(|err| {
            error!(
                "Failed to update deployment {}/{}: {}",
                pod.namespace, pod.name, err
            );
        })?;

        let changed = self.repository.update(&pod).await.inspect_err(|err| {
            error!(
                "Deployment {}/{} was updated but pod {} was not: {}",
                pod.namespace, pod.name, id, err
            );
        })?;

        info!("Updated pod {} (changed: {:?})", id, changed);
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<DeleteOutcome, AppError> {
        let pod = self.find_by_id(id).await?;

        self.workloads
            .delete(&pod.namespace, &pod.name)
            .await
            .inspect_err(|err| {
                error!(
                    "Failed to delete deployment {}/{} of pod {}: {}",
                    pod.namespace, pod.name, id, err
                );
            })?;

        match self.repository.delete(id).await {
            Ok(rows) => {
                info!("Deleted pod {} ({} rows)", id, rows);
                Ok(DeleteOutcome::Deleted { rows })
            }
            Err(err) => {
                error!(
                    "Deployment {}/{} was deleted but pod {} is still stored: {}",
                    pod.namespace, pod.name, id, err
                );
                Ok(DeleteOutcome::WorkloadOnly {
                    reason: err.to_string(),
                })
            }
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<PodSpec, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pod {} not found", id)))
    }

    pub async fn find_all(&self) -> Result<Vec<PodSpec>, AppError> {
        self.repository.find_all().await
    }
}
