use super::policy::{Protocol, PullPolicy, RestartPolicy};
use crate::error::AppError;

/// Durable, user-declared description of a workload.
///
/// `(namespace, name)` is the key on the Kubernetes side, `id` is the key on
/// the database side. `id` stays `None` until the row has been written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PodSpec {
    pub id: Option<i64>,
    pub namespace: String,
    pub name: String,
    pub team_id: String,
    pub replicas: i32,
    pub cpu_min: f32,
    pub cpu_max: f32,
    pub memory_min: f32,
    pub memory_max: f32,
    pub image: String,
    pub pull_policy: PullPolicy,
    pub restart_policy: RestartPolicy,
    pub r#type: String,
    pub ports: Vec<PortSpec>,
    pub envs: Vec<EnvSpec>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortSpec {
    pub id: Option<i64>,
    pub pod_id: Option<i64>,
    pub container_port: i32,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvSpec {
    pub id: Option<i64>,
    pub pod_id: Option<i64>,
    pub key: String,
    pub value: String,
}

impl PortSpec {
    pub fn new(container_port: i32, protocol: Protocol) -> Self {
        Self {
            container_port,
            protocol,
            ..Default::default()
        }
    }
}

impl EnvSpec {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

impl PodSpec {
    /// Rejects specs that would produce an invalid Deployment.
    ///
    /// Policy fields are not checked here, unknown values already resolved
    /// to their defaults when the `PodSpec` was built.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.namespace.is_empty() {
            return Err(AppError::InvalidInput("pod namespace is required".to_string()));
        }
        if self.name.is_empty() {
            return Err(AppError::InvalidInput("pod name is required".to_string()));
        }
        if self.replicas < 0 {
            return Err(AppError::InvalidInput(format!(
                "pod {} replicas must not be negative, got {}",
                self.name, self.replicas
            )));
        }

        check_bounds(&self.name, "cpu", self.cpu_min, self.cpu_max)?;
        check_bounds(&self.name, "memory", self.memory_min, self.memory_max)?;

        if let Some(port) = self
            .ports
            .iter()
            .find(|p| !(1..=65535).contains(&p.container_port))
        {
            return Err(AppError::InvalidInput(format!(
                "pod {} container port {} is out of range 1-65535",
                self.name, port.container_port
            )));
        }
        Ok(())
    }

    pub fn id_or_invalid(&self) -> Result<i64, AppError> {
        self.id
            .ok_or_else(|| AppError::InvalidInput(format!("pod {} has no id", self.name)))
    }

    /// `(namespace, name)` names the Deployment, so it cannot change after add.
    pub fn ensure_same_identity(&self, stored: &PodSpec) -> Result<(), AppError> {
        if self.namespace != stored.namespace || self.name != stored.name {
            return Err(AppError::InvalidInput(format!(
                "pod {} is {}/{}, namespace and name cannot be changed to {}/{}",
                stored.id.unwrap_or_default(),
                stored.namespace,
                stored.name,
                self.namespace,
                self.name
            )));
        }
        Ok(())
    }
}

fn check_bounds(name: &str, resource: &str, min: f32, max: f32) -> Result<(), AppError> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 || max < 0.0 {
        return Err(AppError::InvalidInput(format!(
            "pod {} {} bounds must be finite and non-negative, got min={} max={}",
            name, resource, min, max
        )));
    }
    if max < min {
        return Err(AppError::InvalidInput(format!(
            "pod {} {} max {} is lower than min {}",
            name, resource, max, min
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PodSpec {
        PodSpec {
            namespace: "ns1".to_string(),
            name: "svc-a".to_string(),
            replicas: 1,
            cpu_min: 0.5,
            cpu_max: 1.0,
            memory_min: 128.0,
            memory_max: 256.0,
            image: "nginx:1.27".to_string(),
            ports: vec![PortSpec::new(8080, Protocol::Tcp)],
            ..Default::default()
        }
    }

    #[test]
    fn valid_spec_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn equal_bounds_are_allowed() {
        let spec = PodSpec {
            cpu_min: 1.0,
            cpu_max: 1.0,
            ..valid()
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn missing_name_or_namespace_is_rejected() {
        let no_name = PodSpec {
            name: String::new(),
            ..valid()
        };
        let no_ns = PodSpec {
            namespace: String::new(),
            ..valid()
        };
        assert!(matches!(no_name.validate(), Err(AppError::InvalidInput(_))));
        assert!(matches!(no_ns.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let spec = PodSpec {
            memory_min: 512.0,
            memory_max: 256.0,
            ..valid()
        };
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("memory max"));
    }

    #[test]
    fn nan_bounds_are_rejected() {
        let spec = PodSpec {
            cpu_max: f32::NAN,
            ..valid()
        };
        assert!(matches!(spec.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let spec = PodSpec {
            ports: vec![PortSpec::new(0, Protocol::Tcp)],
            ..valid()
        };
        assert!(spec.validate().is_err());

        let spec = PodSpec {
            ports: vec![PortSpec::new(65536, Protocol::Udp)],
            ..valid()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn identity_must_match_stored_pod() {
        let stored = PodSpec {
            id: Some(4),
            ..valid()
        };
        let same = PodSpec {
            replicas: 9,
            ..stored.clone()
        };
        assert!(same.ensure_same_identity(&stored).is_ok());

        let renamed = PodSpec {
            name: "svc-b".to_string(),
            ..stored.clone()
        };
        let moved = PodSpec {
            namespace: "ns2".to_string(),
            ..stored.clone()
        };
        assert!(matches!(
            renamed.ensure_same_identity(&stored),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            moved.ensure_same_identity(&stored),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn negative_replicas_are_rejected() {
        let spec = PodSpec {
            replicas: -1,
            ..valid()
        };
        assert!(spec.validate().is_err());
    }
}
