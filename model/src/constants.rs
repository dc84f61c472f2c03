//! Well-known paths, mount points, and template tokens shared between the launcher, the worker
//! sidecar, and the archive assembler. Centralized here so the three never drift apart.

/// Where plugin result artifacts are mounted inside both the plugin container and the sidecar.
pub const RESULTS_MOUNT_PATH: &str = "/tmp/sonobuoy/results";

/// Where configmap entries are mounted inside the plugin container.
pub const CONFIG_MOUNT_PATH: &str = "/tmp/sonobuoy/config";

/// The file the plugin container creates to signal completion to the sidecar.
pub const DONE_FILE_NAME: &str = "done";

/// The `node_key` used for Job-driver plugins, which produce a single global result.
pub const GLOBAL_NODE_KEY: &str = "global";

/// Default command when a plugin does not specify one.
pub const DEFAULT_COMMAND: &[&str] = &["./run.sh"];

/// Template tokens substituted into plugin env vars, command args, and volume contents before
/// the workload is submitted to the cluster. See `launcher::template`.
pub const TOKEN_AGGREGATOR_URL: &str = "aggregator_url";
pub const TOKEN_RESULT_TYPE: &str = "result_type";
pub const TOKEN_PLUGIN_NAME: &str = "plugin_name";
pub const TOKEN_NODE_NAME: &str = "node_name";
pub const TOKEN_CA_CERT_PEM: &str = "ca_cert_pem";
pub const TOKEN_CLIENT_CERT_PEM: &str = "client_cert_pem";
pub const TOKEN_CLIENT_KEY_PEM: &str = "client_key_pem";
pub const TOKEN_PROGRESS_PORT: &str = "progress_port";
pub const TOKEN_K8S_VERSION: &str = "k8s_version";

pub const ALL_TOKENS: &[&str] = &[
    TOKEN_AGGREGATOR_URL,
    TOKEN_RESULT_TYPE,
    TOKEN_PLUGIN_NAME,
    TOKEN_NODE_NAME,
    TOKEN_CA_CERT_PEM,
    TOKEN_CLIENT_CERT_PEM,
    TOKEN_CLIENT_KEY_PEM,
    TOKEN_PROGRESS_PORT,
    TOKEN_K8S_VERSION,
];

/// URL path templates for the aggregation server (§4.3), shared by the server's router and the
/// worker sidecar's HTTP client so the two sides of the wire protocol cannot drift apart.
pub mod routes {
    pub fn results_by_node(node: &str, result_type: &str) -> String {
        format!("/api/v1/results/by-node/{}/{}", node, result_type)
    }

    pub fn results_global(result_type: &str) -> String {
        format!("/api/v1/results/global/{}", result_type)
    }

    pub fn progress_by_node(node: &str, result_type: &str) -> String {
        format!("/api/v1/progress/by-node/{}/{}", node, result_type)
    }

    pub fn progress_global(result_type: &str) -> String {
        format!("/api/v1/progress/global/{}", result_type)
    }
}

/// Archive member paths. `{}` placeholders are filled in by the archive assembler.
pub mod archive_paths {
    pub const META_CONFIG: &str = "meta/config.json";
    pub const META_INFO: &str = "meta/info.json";
    pub const META_QUERY_TIME: &str = "meta/query-time.json";

    pub fn plugin_definition(plugin: &str) -> String {
        format!("plugins/{}/definition.json", plugin)
    }

    pub fn plugin_result_tree(plugin: &str) -> String {
        format!("plugins/{}/sonobuoy_results.yaml", plugin)
    }

    pub fn plugin_result_file(plugin: &str, node: &str, file: &str) -> String {
        format!("plugins/{}/results/{}/{}", plugin, node, file)
    }

    pub fn plugin_error(plugin: &str, node: &str) -> String {
        format!("plugins/{}/errors/{}.json", plugin, node)
    }
}
