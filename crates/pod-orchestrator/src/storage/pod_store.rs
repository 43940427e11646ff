use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::model::{EnvSpec, PodSpec, PortSpec, Protocol, PullPolicy, RestartPolicy};

/// Durable side of a pod: the `pods` row and the `pod_ports`/`pod_envs`
/// rows it owns.
#[async_trait]
pub trait PodRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<PodSpec>, AppError>;

    async fn find_all(&self) -> Result<Vec<PodSpec>, AppError>;

    /// Inserts the pod and its owned rows, returns the new pod id.
    async fn create(&self, pod: &PodSpec) -> Result<i64, AppError>;

    /// Writes the columns that differ from the stored row and returns their
    /// names. Owned rows are replaced when either collection changed.
    async fn update(&self, pod: &PodSpec) -> Result<Vec<&'static str>, AppError>;

    /// Removes the pod row and every owned row in one transaction, returns the
    /// number of rows removed.
    async fn delete(&self, id: i64) -> Result<u64, AppError>;
}

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS pods (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pod_namespace TEXT NOT NULL,
        pod_name TEXT NOT NULL,
        pod_team_id TEXT NOT NULL DEFAULT '',
        pod_cpu_max REAL NOT NULL DEFAULT 0,
        pod_cpu_min REAL NOT NULL DEFAULT 0,
        pod_replicas INTEGER NOT NULL DEFAULT 0,
        pod_memory_max REAL NOT NULL DEFAULT 0,
        pod_memory_min REAL NOT NULL DEFAULT 0,
        pod_pull_policy TEXT NOT NULL,
        pod_restart TEXT NOT NULL,
        pod_type TEXT NOT NULL DEFAULT '',
        pod_image TEXT NOT NULL DEFAULT '',
        UNIQUE (pod_namespace, pod_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pod_ports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pod_id INTEGER NOT NULL REFERENCES pods(id) DEFERRABLE INITIALLY DEFERRED,
        container_port INTEGER NOT NULL,
        protocol TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pod_ports_pod_id ON pod_ports (pod_id)",
    r#"
    CREATE TABLE IF NOT EXISTS pod_envs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pod_id INTEGER NOT NULL REFERENCES pods(id) DEFERRABLE INITIALLY DEFERRED,
        env_key TEXT NOT NULL,
        env_value TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pod_envs_pod_id ON pod_envs (pod_id)",
];

// pod row first, owned rows after. Foreign keys are checked at commit.
const DELETE_STATEMENTS: [(&str, &str); 3] = [
    ("pods", "DELETE FROM pods WHERE id = ?"),
    ("pod_ports", "DELETE FROM pod_ports WHERE pod_id = ?"),
    ("pod_envs", "DELETE FROM pod_envs WHERE pod_id = ?"),
];

const SELECT_POD: &str = "SELECT id, pod_namespace, pod_name, pod_team_id, pod_cpu_max, pod_cpu_min, \
     pod_replicas, pod_memory_max, pod_memory_min, pod_pull_policy, pod_restart, pod_type, pod_image \
     FROM pods";

#[derive(sqlx::FromRow)]
struct PodRow {
    id: i64,
    pod_namespace: String,
    pod_name: String,
    pod_team_id: String,
    pod_cpu_max: f64,
    pod_cpu_min: f64,
    pod_replicas: i32,
    pod_memory_max: f64,
    pod_memory_min: f64,
    pod_pull_policy: String,
    pod_restart: String,
    pod_type: String,
    pod_image: String,
}

#[derive(sqlx::FromRow)]
struct PortRow {
    id: i64,
    pod_id: i64,
    container_port: i32,
    protocol: String,
}

#[derive(sqlx::FromRow)]
struct EnvRow {
    id: i64,
    pod_id: i64,
    env_key: String,
    env_value: String,
}

impl PodRow {
    fn into_spec(self, ports: Vec<PortSpec>, envs: Vec<EnvSpec>) -> PodSpec {
        PodSpec {
            id: Some(self.id),
            namespace: self.pod_namespace,
            name: self.pod_name,
            team_id: self.pod_team_id,
            replicas: self.pod_replicas,
            cpu_min: self.pod_cpu_min as f32,
            cpu_max: self.pod_cpu_max as f32,
            memory_min: self.pod_memory_min as f32,
            memory_max: self.pod_memory_max as f32,
            image: self.pod_image,
            pull_policy: PullPolicy::parse(&self.pod_pull_policy),
            restart_policy: RestartPolicy::parse(&self.pod_restart),
            r#type: self.pod_type,
            ports,
            envs,
        }
    }
}

impl From<PortRow> for PortSpec {
    fn from(row: PortRow) -> Self {
        Self {
            id: Some(row.id),
            pod_id: Some(row.pod_id),
            container_port: row.container_port,
            protocol: Protocol::parse(&row.protocol),
        }
    }
}

impl From<EnvRow> for EnvSpec {
    fn from(row: EnvRow) -> Self {
        Self {
            id: Some(row.id),
            pod_id: Some(row.pod_id),
            key: row.env_key,
            value: row.env_value,
        }
    }
}

enum ColumnValue {
    Text(String),
    Real(f32),
    Int(i32),
}

#[derive(Clone)]
pub struct PodStore {
    pool: SqlitePool,
}

impl PodStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

        // every connection to an in-memory database opens its own database
        if config.is_in_memory() {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PodRepository for PodStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<PodSpec>, AppError> {
        let mut conn = self.pool.acquire().await?;
        load_pod(&mut conn, id).await.map_err(AppError::from)
    }

    async fn find_all(&self) -> Result<Vec<PodSpec>, AppError> {
        let pods = sqlx::query_as::<_, PodRow>(&format!("{} ORDER BY id", SELECT_POD))
            .fetch_all(&self.pool)
            .await?;
        let ports = sqlx::query_as::<_, PortRow>(
            "SELECT id, pod_id, container_port, protocol FROM pod_ports ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        let envs = sqlx::query_as::<_, EnvRow>(
            "SELECT id, pod_id, env_key, env_value FROM pod_envs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ports_by_pod: HashMap<i64, Vec<PortSpec>> = HashMap::new();
        for row in ports {
            ports_by_pod.entry(row.pod_id).or_default().push(row.into());
        }
        let mut envs_by_pod: HashMap<i64, Vec<EnvSpec>> = HashMap::new();
        for row in envs {
            envs_by_pod.entry(row.pod_id).or_default().push(row.into());
        }

        Ok(pods
            .into_iter()
            .map(|row| {
                let ports = ports_by_pod.remove(&row.id).unwrap_or_default();
                let envs = envs_by_pod.remove(&row.id).unwrap_or_default();
                row.into_spec(ports, envs)
            })
            .collect())
    }

    async fn create(&self, pod: &PodSpec) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO pods
                (pod_namespace, pod_name, pod_team_id, pod_cpu_max, pod_cpu_min, pod_replicas,
                 pod_memory_max, pod_memory_min, pod_pull_policy, pod_restart, pod_type, pod_image)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pod.namespace)
        .bind(&pod.name)
        .bind(&pod.team_id)
        .bind(f64::from(pod.cpu_max))
        .bind(f64::from(pod.cpu_min))
        .bind(pod.replicas)
        .bind(f64::from(pod.memory_max))
        .bind(f64::from(pod.memory_min))
        .bind(pod.pull_policy.as_str())
        .bind(pod.restart_policy.as_str())
        .bind(&pod.r#type)
        .bind(&pod.image)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, pod))?
        .last_insert_rowid();

        insert_owned(&mut tx, id, &pod.ports, &pod.envs).await?;
        tx.commit().await?;

        Ok(id)
    }

    async fn update(&self, pod: &PodSpec) -> Result<Vec<&'static str>, AppError> {
        let id = pod.id_or_invalid()?;
        let mut tx = self.pool.begin().await?;

        let current = load_pod(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pod {} not found", id)))?;
        pod.ensure_same_identity(&current)?;

        let columns = changed_columns(&current, pod);
        let mut changed: Vec<&'static str> = columns.iter().map(|(name, _)| *name).collect();

        if !columns.is_empty() {
            let mut query = QueryBuilder::<Sqlite>::new("UPDATE pods SET ");
            let mut set = query.separated(", ");
            for (name, value) in columns {
                set.push(format!("{} = ", name));
                match value {
                    ColumnValue::Text(v) => set.push_bind_unseparated(v),
                    ColumnValue::Real(v) => set.push_bind_unseparated(f64::from(v)),
                    ColumnValue::Int(v) => set.push_bind_unseparated(v),
                };
            }
            query.push(" WHERE id = ").push_bind(id);
            query
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error(e, pod))?;
        }

        let ports_changed = port_keys(&current.ports) != port_keys(&pod.ports);
        let envs_changed = env_keys(&current.envs) != env_keys(&pod.envs);
        if ports_changed || envs_changed {
            sqlx::query("DELETE FROM pod_ports WHERE pod_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM pod_envs WHERE pod_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_owned(&mut tx, id, &pod.ports, &pod.envs).await?;
        }
        if ports_changed {
            changed.push("pod_port");
        }
        if envs_changed {
            changed.push("pod_env");
        }

        tx.commit().await?;
        Ok(changed)
    }

    async fn delete(&self, id: i64) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for (table, stmt) in DELETE_STATEMENTS {
            match sqlx::query(stmt).bind(id).execute(&mut *tx).await {
                Ok(result) => removed += result.rows_affected(),
                Err(err) => {
                    tracing::error!("Failed to delete {} rows of pod {}: {}", table, id, err);
                    if let Err(rollback) = tx.rollback().await {
                        tracing::error!("Failed to roll back delete of pod {}: {}", id, rollback);
                    }
                    return Err(AppError::from(err));
                }
            }
        }

        tx.commit().await?;
        Ok(removed)
    }
}

async fn load_pod(conn: &mut SqliteConnection, id: i64) -> Result<Option<PodSpec>, sqlx::Error> {
    let Some(row) = sqlx::query_as::<_, PodRow>(&format!("{} WHERE id = ?", SELECT_POD))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let ports = sqlx::query_as::<_, PortRow>(
        "SELECT id, pod_id, container_port, protocol FROM pod_ports WHERE pod_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let envs = sqlx::query_as::<_, EnvRow>(
        "SELECT id, pod_id, env_key, env_value FROM pod_envs WHERE pod_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(row.into_spec(
        ports.into_iter().map(PortSpec::from).collect(),
        envs.into_iter().map(EnvSpec::from).collect(),
    )))
}

async fn insert_owned(
    conn: &mut SqliteConnection,
    pod_id: i64,
    ports: &[PortSpec],
    envs: &[EnvSpec],
) -> Result<(), sqlx::Error> {
    for port in ports {
        sqlx::query("INSERT INTO pod_ports (pod_id, container_port, protocol) VALUES (?, ?, ?)")
            .bind(pod_id)
            .bind(port.container_port)
            .bind(port.protocol.as_str())
            .execute(&mut *conn)
            .await?;
    }
    for env in envs {
        sqlx::query("INSERT INTO pod_envs (pod_id, env_key, env_value) VALUES (?, ?, ?)")
            .bind(pod_id)
            .bind(&env.key)
            .bind(&env.value)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn changed_columns(current: &PodSpec, next: &PodSpec) -> Vec<(&'static str, ColumnValue)> {
    let mut columns = Vec::new();

    let texts = [
        ("pod_team_id", &current.team_id, &next.team_id),
        ("pod_type", &current.r#type, &next.r#type),
        ("pod_image", &current.image, &next.image),
    ];
    for (name, old, new) in texts {
        if old != new {
            columns.push((name, ColumnValue::Text(new.clone())));
        }
    }

    let reals = [
        ("pod_cpu_max", current.cpu_max, next.cpu_max),
        ("pod_cpu_min", current.cpu_min, next.cpu_min),
        ("pod_memory_max", current.memory_max, next.memory_max),
        ("pod_memory_min", current.memory_min, next.memory_min),
    ];
    for (name, old, new) in reals {
        if old != new {
            columns.push((name, ColumnValue::Real(new)));
        }
    }

    if current.replicas != next.replicas {
        columns.push(("pod_replicas", ColumnValue::Int(next.replicas)));
    }
    if current.pull_policy != next.pull_policy {
        columns.push((
            "pod_pull_policy",
            ColumnValue::Text(next.pull_policy.as_str().to_string()),
        ));
    }
    if current.restart_policy != next.restart_policy {
        columns.push((
            "pod_restart",
            ColumnValue::Text(next.restart_policy.as_str().to_string()),
        ));
    }
    columns
}

fn port_keys(ports: &[PortSpec]) -> Vec<(i32, Protocol)> {
    ports.iter().map(|p| (p.container_port, p.protocol)).collect()
}

fn env_keys(envs: &[EnvSpec]) -> Vec<(&str, &str)> {
    envs.iter()
        .map(|e| (e.key.as_str(), e.value.as_str()))
        .collect()
}

fn write_error(err: sqlx::Error, pod: &PodSpec) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
            "pod {}/{} already exists in store",
            pod.namespace, pod.name
        )),
        _ => AppError::from(err),
    }
}
