use proto::pod::orchestrator::v1 as pb;

use crate::model::{EnvSpec, PodSpec, PortSpec, Protocol, PullPolicy, RestartPolicy};

// 0 is the proto3 default, read it as "not assigned yet"
fn id_from_wire(id: i64) -> Option<i64> {
    (id != 0).then_some(id)
}

impl From<pb::PodInfo> for PodSpec {
    fn from(info: pb::PodInfo) -> Self {
        Self {
            id: id_from_wire(info.id),
            namespace: info.pod_namespace,
            name: info.pod_name,
            team_id: info.pod_team_id,
            replicas: info.pod_replicas,
            cpu_min: info.pod_cpu_min,
            cpu_max: info.pod_cpu_max,
            memory_min: info.pod_memory_min,
            memory_max: info.pod_memory_max,
            image: info.pod_image,
            pull_policy: PullPolicy::parse(&info.pod_pull_policy),
            restart_policy: RestartPolicy::parse(&info.pod_restart),
            r#type: info.pod_type,
            ports: info.pod_port.into_iter().map(PortSpec::from).collect(),
            envs: info.pod_env.into_iter().map(EnvSpec::from).collect(),
        }
    }
}

impl From<pb::PodPort> for PortSpec {
    fn from(port: pb::PodPort) -> Self {
        Self {
            id: id_from_wire(port.id),
            pod_id: id_from_wire(port.pod_id),
            container_port: port.container_port,
            protocol: Protocol::parse(&port.protocol),
        }
    }
}

impl From<pb::PodEnv> for EnvSpec {
    fn from(env: pb::PodEnv) -> Self {
        Self {
            id: id_from_wire(env.id),
            pod_id: id_from_wire(env.pod_id),
            key: env.env_key,
            value: env.env_value,
        }
    }
}

impl From<PodSpec> for pb::PodInfo {
    fn from(pod: PodSpec) -> Self {
        Self {
            id: pod.id.unwrap_or_default(),
            pod_namespace: pod.namespace,
            pod_name: pod.name,
            pod_team_id: pod.team_id,
            pod_cpu_max: pod.cpu_max,
            pod_cpu_min: pod.cpu_min,
            pod_replicas: pod.replicas,
            pod_memory_max: pod.memory_max,
            pod_memory_min: pod.memory_min,
            pod_pull_policy: pod.pull_policy.as_str().to_string(),
            pod_restart: pod.restart_policy.as_str().to_string(),
            pod_type: pod.r#type,
            pod_image: pod.image,
            pod_port: pod.ports.into_iter().map(pb::PodPort::from).collect(),
            pod_env: pod.envs.into_iter().map(pb::PodEnv::from).collect(),
        }
    }
}

impl From<PortSpec> for pb::PodPort {
    fn from(port: PortSpec) -> Self {
        Self {
            id: port.id.unwrap_or_default(),
            pod_id: port.pod_id.unwrap_or_default(),
            container_port: port.container_port,
            protocol: port.protocol.as_str().to_string(),
        }
    }
}

impl From<EnvSpec> for pb::PodEnv {
    fn from(env: EnvSpec) -> Self {
        Self {
            id: env.id.unwrap_or_default(),
            pod_id: env.pod_id.unwrap_or_default(),
            env_key: env.key,
            env_value: env.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> pb::PodInfo {
        pb::PodInfo {
            id: 12,
            pod_namespace: "ns1".to_string(),
            pod_name: "svc-a".to_string(),
            pod_team_id: "team-7".to_string(),
            pod_cpu_max: 2.0,
            pod_cpu_min: 0.5,
            pod_replicas: 2,
            pod_memory_max: 1024.0,
            pod_memory_min: 256.0,
            pod_pull_policy: "IfNotPresent".to_string(),
            pod_restart: "OnFailure".to_string(),
            pod_type: "api".to_string(),
            pod_image: "registry.local/svc-a:1".to_string(),
            pod_port: vec![pb::PodPort {
                id: 3,
                pod_id: 12,
                container_port: 8080,
                protocol: "UDP".to_string(),
            }],
            pod_env: vec![pb::PodEnv {
                id: 4,
                pod_id: 12,
                env_key: "KEY".to_string(),
                env_value: "VALUE".to_string(),
            }],
        }
    }

    #[test]
    fn every_field_is_mapped() {
        let spec = PodSpec::from(info());

        assert_eq!(spec.id, Some(12));
        assert_eq!(spec.namespace, "ns1");
        assert_eq!(spec.name, "svc-a");
        assert_eq!(spec.team_id, "team-7");
        assert_eq!(spec.replicas, 2);
        assert_eq!((spec.cpu_min, spec.cpu_max), (0.5, 2.0));
        assert_eq!((spec.memory_min, spec.memory_max), (256.0, 1024.0));
        assert_eq!(spec.image, "registry.local/svc-a:1");
        assert_eq!(spec.pull_policy, PullPolicy::IfNotPresent);
        assert_eq!(spec.restart_policy, RestartPolicy::OnFailure);
        assert_eq!(spec.r#type, "api");
        assert_eq!(
            spec.ports,
            vec![PortSpec {
                id: Some(3),
                pod_id: Some(12),
                container_port: 8080,
                protocol: Protocol::Udp,
            }]
        );
        assert_eq!(
            spec.envs,
            vec![EnvSpec {
                id: Some(4),
                pod_id: Some(12),
                key: "KEY".to_string(),
                value: "VALUE".to_string(),
            }]
        );

        assert_eq!(pb::PodInfo::from(spec), info());
    }

    #[test]
    fn zero_ids_are_unassigned() {
        let spec = PodSpec::from(pb::PodInfo {
            id: 0,
            pod_port: vec![pb::PodPort {
                container_port: 80,
                ..Default::default()
            }],
            ..info()
        });
        assert_eq!(spec.id, None);
        assert_eq!(spec.ports[0].id, None);
        assert_eq!(spec.ports[0].pod_id, None);
    }

    #[test]
    fn unknown_policies_are_normalized() {
        let spec = PodSpec::from(pb::PodInfo {
            pod_pull_policy: "whenever".to_string(),
            pod_restart: String::new(),
            pod_port: vec![pb::PodPort {
                container_port: 80,
                protocol: "tcp".to_string(),
                ..Default::default()
            }],
            ..info()
        });
        let back = pb::PodInfo::from(spec);
        assert_eq!(back.pod_pull_policy, "Always");
        assert_eq!(back.pod_restart, "Always");
        assert_eq!(back.pod_port[0].protocol, "TCP");
    }
}
