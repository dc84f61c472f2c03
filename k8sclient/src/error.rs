use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to create {} '{}': {}", kind, name, source))]
    Create {
        kind: String,
        name: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to delete {} '{}': {}", kind, name, source))]
    Delete {
        kind: String,
        name: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to list {}: {}", kind, source))]
    List { kind: String, source: kube::Error },

    #[snafu(display("Unable to get pod '{}': {}", name, source))]
    GetPod { name: String, source: kube::Error },

    #[snafu(display("Unable to exec into pod '{}' container '{}': {}", pod, container, source))]
    Exec {
        pod: String,
        container: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to build k8s client: {}", source))]
    ClientSetup { source: kube::Error },
}
