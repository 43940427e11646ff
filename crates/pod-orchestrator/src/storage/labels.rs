pub const LABEL_APP_NAME: &str = "app-name";

pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_MANAGED_BY_VALUE: &str = "pod-orchestrator";
