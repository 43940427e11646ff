// Shared fixtures for the integration tests.
// Every test gets its own in-memory database, no cluster is needed.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use pod_orchestrator::{
    config::DatabaseConfig,
    error::AppError,
    model::{EnvSpec, PodSpec, PortSpec, Protocol, PullPolicy, RestartPolicy},
    service::PodService,
    state::AppState,
    storage::{PodStore, WorkloadGateway},
};
use rstest::fixture;

#[fixture]
pub async fn store() -> PodStore {
    let store = PodStore::connect(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to open in-memory database");
    store.migrate().await.expect("Failed to create schema");
    store
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { namespace: String, name: String },
    Update { namespace: String, name: String },
    Delete { namespace: String, name: String },
}

/// Records every call and answers with the configured result.
#[derive(Default)]
pub struct FakeWorkloads {
    pub create_fails: bool,
    pub update_fails: bool,
    pub delete_fails: bool,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeWorkloads {
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// The usual shape for a fresh add: the create call reports an error.
    pub fn create_failing() -> Self {
        Self {
            create_fails: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn answer(fails: bool, what: &str) -> Result<(), AppError> {
        if fails {
            Err(AppError::Internal(format!("fake {} failure", what)))
        } else {
            Ok(())
        }
    }
}

fn key_of(deployment: &Deployment) -> (String, String) {
    (
        deployment.metadata.namespace.clone().unwrap_or_default(),
        deployment.metadata.name.clone().unwrap_or_default(),
    )
}

#[async_trait]
impl WorkloadGateway for FakeWorkloads {
    async fn create(&self, deployment: &Deployment) -> Result<(), AppError> {
        let (namespace, name) = key_of(deployment);
        self.record(Call::Create { namespace, name });
        Self::answer(self.create_fails, "create")
    }

    async fn update(&self, deployment: &Deployment) -> Result<(), AppError> {
        let (namespace, name) = key_of(deployment);
        self.record(Call::Update { namespace, name });
        Self::answer(self.update_fails, "update")
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), AppError> {
        self.record(Call::Delete {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        Self::answer(self.delete_fails, "delete")
    }
}

pub fn service(store: &PodStore, workloads: &Arc<FakeWorkloads>) -> PodService {
    PodService::new(Arc::new(store.clone()), workloads.clone())
}

pub fn app_state(store: &PodStore, workloads: &Arc<FakeWorkloads>) -> AppState {
    AppState {
        pod_service: service(store, workloads),
        pod_store: store.clone(),
    }
}

pub fn sample_pod(namespace: &str, name: &str) -> PodSpec {
    PodSpec {
        id: None,
        namespace: namespace.to_string(),
        name: name.to_string(),
        team_id: "team-1".to_string(),
        replicas: 2,
        cpu_min: 0.5,
        cpu_max: 1.0,
        memory_min: 128.0,
        memory_max: 256.0,
        image: "nginx:1.27".to_string(),
        pull_policy: PullPolicy::IfNotPresent,
        restart_policy: RestartPolicy::Always,
        r#type: "web".to_string(),
        ports: vec![PortSpec::new(8080, Protocol::Tcp)],
        envs: vec![EnvSpec::new("KEY", "VALUE")],
    }
}

pub async fn count_rows(store: &PodStore, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(store.pool())
        .await
        .expect("Failed to count rows")
}

pub async fn total_rows(store: &PodStore) -> (i64, i64, i64) {
    (
        count_rows(store, "pods").await,
        count_rows(store, "pod_ports").await,
        count_rows(store, "pod_envs").await,
    )
}

/// Makes every delete on `pod_envs` abort, the last step of a pod delete.
pub async fn break_env_deletes(store: &PodStore) {
    sqlx::query(
        "CREATE TRIGGER fail_env_delete BEFORE DELETE ON pod_envs \
         BEGIN SELECT RAISE(ABORT, 'forced env delete failure'); END",
    )
    .execute(store.pool())
    .await
    .expect("Failed to install trigger");
}
