use crate::cert::ClientIdentity;
use crate::template::TokenValues;
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    LocalObjectReference, ObjectFieldSelector, PodSpec, PodTemplateSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use model::constants::{CONFIG_MOUNT_PATH, RESULTS_MOUNT_PATH};
use model::plugin::PluginDefinition;
use std::collections::BTreeMap;

pub(crate) const APP_NAME: &str = "app.kubernetes.io/name";
pub(crate) const APP_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub(crate) const APP_PART_OF: &str = "app.kubernetes.io/part-of";
pub(crate) const SONOBUOY: &str = "sonobuoy";
const RESULTS_VOLUME: &str = "results";
const CONFIG_VOLUME: &str = "config";

/// Builds the two-container pod (plugin + worker sidecar) for one plugin, grounded on the
/// teacher's `JobBuilder` (`controller/src/job/job_builder.rs`) but extended with the sidecar
/// container, the shared emptyDir, and the optional configmap volume from SPEC_FULL.md §4.1/4.2.
pub struct PluginPodBuilder<'a> {
    pub plugin: &'a PluginDefinition,
    pub sidecar_image: String,
    pub pull_secret: Option<String>,
    pub tokens: &'a TokenValues,
    pub identity: &'a ClientIdentity,
    pub ca_cert_pem: String,
    pub progress_port: u16,
}

impl PluginPodBuilder<'_> {
    fn labels(&self) -> BTreeMap<String, String> {
        [
            (APP_NAME, self.plugin.name.as_str()),
            (APP_MANAGED_BY, "sonobuoy-controller"),
            (APP_PART_OF, SONOBUOY),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn volumes(&self) -> Vec<Volume> {
        let mut volumes = vec![Volume {
            name: RESULTS_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Volume::default()
        }];
        if !self.plugin.configmap.is_empty() {
            volumes.push(Volume {
                name: CONFIG_VOLUME.to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: Some(configmap_name(&self.plugin.name)),
                    ..ConfigMapVolumeSource::default()
                }),
                ..Volume::default()
            });
        }
        volumes
    }

    fn shared_mounts(&self) -> Vec<VolumeMount> {
        let mut mounts = vec![VolumeMount {
            name: RESULTS_VOLUME.to_string(),
            mount_path: RESULTS_MOUNT_PATH.to_string(),
            ..VolumeMount::default()
        }];
        if !self.plugin.configmap.is_empty() {
            mounts.push(VolumeMount {
                name: CONFIG_VOLUME.to_string(),
                mount_path: CONFIG_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..VolumeMount::default()
            });
        }
        mounts
    }

    fn plugin_container(&self) -> Container {
        Container {
            name: "plugin".to_string(),
            image: Some(self.plugin.container.image.clone()),
            command: Some(self.plugin.command()),
            args: if self.plugin.container.args.is_empty() {
                None
            } else {
                Some(self.plugin.container.args.clone())
            },
            env: Some(env_vars(&self.plugin.container.env)),
            volume_mounts: Some(self.shared_mounts()),
            ..Container::default()
        }
    }

    fn sidecar_container(&self) -> Container {
        let mut env = vec![
            env("RESULT_TYPE", &self.plugin.name),
            env("AGGREGATOR_URL", self.tokens_render("{aggregator_url}")),
            env("PLUGIN_NAME", &self.plugin.name),
            env("PROGRESS_PORT", self.progress_port.to_string()),
            env("CA_CERT_PEM", &self.ca_cert_pem),
            env("CLIENT_CERT_PEM", &self.identity.cert_pem),
            env("CLIENT_KEY_PEM", &self.identity.key_pem),
            env("RESULTS_MOUNT_PATH", RESULTS_MOUNT_PATH),
            env("RESULT_FILES", self.plugin.result_files.join(",")),
            node_name_env(),
        ];
        env.sort_by(|a, b| a.name.cmp(&b.name));
        Container {
            name: "sonobuoy-worker".to_string(),
            image: Some(self.sidecar_image.clone()),
            env: Some(env),
            volume_mounts: Some(vec![VolumeMount {
                name: RESULTS_VOLUME.to_string(),
                mount_path: RESULTS_MOUNT_PATH.to_string(),
                ..VolumeMount::default()
            }]),
            ..Container::default()
        }
    }

    fn tokens_render(&self, input: &str) -> String {
        self.tokens
            .render(&self.plugin.name, input)
            .unwrap_or_else(|_| input.to_string())
    }

    fn pod_spec(&self) -> PodSpec {
        PodSpec {
            containers: vec![self.plugin_container(), self.sidecar_container()],
            restart_policy: Some("Never".to_string()),
            volumes: Some(self.volumes()),
            image_pull_secrets: self.pull_secret.as_ref().map(|secret| {
                vec![LocalObjectReference {
                    name: Some(secret.clone()),
                }]
            }),
            node_selector: self.plugin.node_selector.clone(),
            ..PodSpec::default()
        }
    }

    fn pod_template(&self) -> PodTemplateSpec {
        PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(self.labels()),
                ..ObjectMeta::default()
            }),
            spec: Some(self.pod_spec()),
        }
    }

    /// Builds a `Job` for a Job-driver plugin: exactly one pod, no retries (a failed plugin pod
    /// is reported through the slot table, not re-run by Kubernetes).
    pub fn build_job(&self) -> Job {
        Job {
            metadata: ObjectMeta {
                name: Some(self.plugin.name.clone()),
                labels: Some(self.labels()),
                ..ObjectMeta::default()
            },
            spec: Some(JobSpec {
                backoff_limit: Some(0),
                template: self.pod_template(),
                ..JobSpec::default()
            }),
            ..Job::default()
        }
    }

    /// Builds a `DaemonSet` for a DaemonSet-driver plugin: the workload manager expands it across
    /// every node matching `node_selector`.
    pub fn build_daemonset(&self) -> DaemonSet {
        DaemonSet {
            metadata: ObjectMeta {
                name: Some(self.plugin.name.clone()),
                labels: Some(self.labels()),
                ..ObjectMeta::default()
            },
            spec: Some(DaemonSetSpec {
                selector: LabelSelector {
                    match_labels: Some(self.labels()),
                    ..LabelSelector::default()
                },
                template: self.pod_template(),
                ..DaemonSetSpec::default()
            }),
            ..DaemonSet::default()
        }
    }

    /// Builds the optional configmap carrying the plugin's `configmap` entries, mounted at
    /// `CONFIG_MOUNT_PATH` (SPEC_FULL.md §4.1). Returns `None` when the plugin has none.
    pub fn build_configmap(&self) -> Option<ConfigMap> {
        if self.plugin.configmap.is_empty() {
            return None;
        }
        Some(ConfigMap {
            metadata: ObjectMeta {
                name: Some(configmap_name(&self.plugin.name)),
                labels: Some(self.labels()),
                ..ObjectMeta::default()
            },
            data: Some(self.plugin.configmap.clone()),
            ..ConfigMap::default()
        })
    }
}

fn configmap_name(plugin_name: &str) -> String {
    format!("{}-config", plugin_name)
}

fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        value_from: None,
    }
}

/// `NODE_NAME` is read from the Downward API rather than templated in, since it is only known
/// once the scheduler places the pod (SPEC_FULL.md §4.1 `{node_name}` token).
fn node_name_env() -> EnvVar {
    EnvVar {
        name: "NODE_NAME".to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: "spec.nodeName".to_string(),
                ..ObjectFieldSelector::default()
            }),
            ..EnvVarSource::default()
        }),
    }
}

fn env_vars(raw: &BTreeMap<String, String>) -> Vec<EnvVar> {
    raw.iter()
        .map(|(name, value)| env(name, value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::plugin::{ContainerSpec, Driver, ResultFormat};

    fn plugin(driver: Driver) -> PluginDefinition {
        PluginDefinition {
            name: "e2e".to_string(),
            driver,
            result_format: ResultFormat::Junit,
            result_files: vec![],
            source_url: None,
            description: None,
            container: ContainerSpec {
                image: "example.com/e2e:latest".to_string(),
                command: vec![],
                args: vec![],
                env: BTreeMap::new(),
            },
            node_selector: None,
            pod_spec_override: None,
            configmap: BTreeMap::new(),
        }
    }

    fn identity() -> ClientIdentity {
        ClientIdentity {
            cert_pem: "cert".to_string(),
            key_pem: "key".to_string(),
            fingerprint: "abc".to_string(),
        }
    }

    #[test]
    fn job_has_two_containers_and_no_retries() {
        let plugin = plugin(Driver::Job);
        let identity = identity();
        let tokens = TokenValues::new();
        let builder = PluginPodBuilder {
            plugin: &plugin,
            sidecar_image: "example.com/worker:latest".to_string(),
            pull_secret: None,
            tokens: &tokens,
            identity: &identity,
            ca_cert_pem: "ca".to_string(),
            progress_port: 8099,
        };
        let job = builder.build_job();
        assert_eq!(job.spec.as_ref().unwrap().backoff_limit, Some(0));
        let containers = &job
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers;
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "plugin");
        assert_eq!(containers[1].name, "sonobuoy-worker");
    }

    #[test]
    fn configmap_only_built_when_plugin_declares_one() {
        let mut plugin = plugin(Driver::Job);
        let identity = identity();
        let tokens = TokenValues::new();
        let builder = PluginPodBuilder {
            plugin: &plugin,
            sidecar_image: "example.com/worker:latest".to_string(),
            pull_secret: None,
            tokens: &tokens,
            identity: &identity,
            ca_cert_pem: "ca".to_string(),
            progress_port: 8099,
        };
        assert!(builder.build_configmap().is_none());

        plugin.configmap.insert("params.yaml".to_string(), "k: v".to_string());
        let builder = PluginPodBuilder {
            plugin: &plugin,
            ..builder
        };
        let cm = builder.build_configmap().unwrap();
        assert_eq!(
            cm.data.unwrap().get("params.yaml").unwrap(),
            "k: v"
        );
        assert_eq!(cm.metadata.name.unwrap(), "e2e-config");
    }

    #[test]
    fn daemonset_selector_matches_template_labels() {
        let plugin = plugin(Driver::DaemonSet);
        let identity = identity();
        let tokens = TokenValues::new();
        let builder = PluginPodBuilder {
            plugin: &plugin,
            sidecar_image: "example.com/worker:latest".to_string(),
            pull_secret: None,
            tokens: &tokens,
            identity: &identity,
            ca_cert_pem: "ca".to_string(),
            progress_port: 8099,
        };
        let ds = builder.build_daemonset();
        let spec = ds.spec.unwrap();
        assert_eq!(
            spec.selector.match_labels,
            spec.template.metadata.unwrap().labels
        );
    }
}
