use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to generate CA certificate: {}", source))]
    GenerateCa { source: rcgen::RcgenError },

    #[snafu(display("Unable to generate client certificate for plugin '{}': {}", plugin, source))]
    GenerateClientCert {
        plugin: String,
        source: rcgen::RcgenError,
    },

    #[snafu(display(
        "Unable to render plugin template for '{}': unknown token '{{{}}}'",
        plugin,
        token
    ))]
    UnknownToken { plugin: String, token: String },

    #[snafu(display("Unable to schedule workload for plugin '{}': {}", plugin, source))]
    Schedule {
        plugin: String,
        source: k8sclient::Error,
    },

    #[snafu(display("Unable to create configmap for plugin '{}': {}", plugin, source))]
    ConfigMap {
        plugin: String,
        source: k8sclient::Error,
    },

    #[snafu(display("Unable to enumerate nodes for plugin '{}': {}", plugin, source))]
    EnumerateNodes {
        plugin: String,
        source: k8sclient::Error,
    },
}
