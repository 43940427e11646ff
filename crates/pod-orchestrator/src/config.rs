use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "pod-orchestrator")]
#[command(about = "Pod Orchestrator - keeps pod specifications in sync between a database and Kubernetes", long_about = None)]
pub struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "./config.yaml", help = "Path to configuration file")]
    pub config: PathBuf,

    #[arg(long, env = "HOST", help = "Server bind address [env: HOST or POD_SERVER__HOST]")]
    pub host: Option<String>,

    #[arg(long, env = "PORT", help = "Server bind port [env: PORT or POD_SERVER__PORT]")]
    pub port: Option<u16>,

    #[arg(long, env = "LOG_LEVEL", help = "Log level: trace, debug, info, warn, error [env: LOG_LEVEL or POD_SERVER__LOG_LEVEL]")]
    pub log_level: Option<String>,

    #[arg(long, env = "KUBE_CONTEXT", help = "Kubernetes context to use [env: KUBE_CONTEXT or POD_KUBERNETES__CONTEXT]")]
    pub kube_context: Option<String>,

    #[arg(long, env = "KUBECONFIG_PATH", help = "Path to a kubeconfig file [env: KUBECONFIG_PATH or POD_KUBERNETES__KUBECONFIG]")]
    pub kubeconfig: Option<PathBuf>,

    #[arg(long, env = "DATABASE_URL", help = "SQLite connection url [env: DATABASE_URL or POD_DATABASE__URL]")]
    pub database_url: Option<String>,

    #[arg(long, help = "Create database tables on startup")]
    pub migrate: bool,
}

fn remove_nulls(value: serde_json::Value) -> serde_json::Value {
    use serde_json::{Map, Value};

    match value {
        Value::Object(map) => {
            let filtered: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| {
                    let cleaned = remove_nulls(v);
                    match &cleaned {
                        Value::Null => None,
                        Value::Object(obj) if obj.is_empty() => None,
                        _ => Some((k, cleaned)),
                    }
                })
                .collect();
            Value::Object(filtered)
        }
        other => other,
    }
}

impl Cli {
    fn to_figment_map(&self) -> serde_json::Value {
        use serde_json::json;

        let value = json!({
            "server": {
                "host": self.host,
                "port": self.port,
                "log_level": self.log_level,
            },
            "kubernetes": {
                "context": self.kube_context,
                "kubeconfig": self.kubeconfig,
            },
            "database": {
                "url": self.database_url,
                // only an explicit flag overrides the file
                "migrate": self.migrate.then_some(true),
            }
        });

        remove_nulls(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubernetesConfig {
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    #[serde(default)]
    pub migrate: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub kubernetes: KubernetesConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrent_requests() -> usize {
    1000
}

fn default_database_url() -> String {
    "sqlite://pods.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            migrate: false,
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            migrate: true,
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment(&Cli::parse()).extract()
    }

    pub fn figment(cli: &Cli) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if cli.config.exists() {
            figment = figment.merge(Yaml::file(&cli.config));
        }

        figment
            .merge(Env::prefixed("POD_").split("__"))
            .merge(Serialized::defaults(cli.to_figment_map()))
    }
}
