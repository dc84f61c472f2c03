use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Missing required environment variable '{}'", name))]
    MissingEnv { name: String },

    #[snafu(display("Invalid value for environment variable '{}': {}", name, source))]
    InvalidEnv {
        name: String,
        source: std::num::ParseIntError,
    },

    #[snafu(display("Unable to build mTLS client identity: {}", source))]
    BuildIdentity { source: reqwest::Error },

    #[snafu(display("Unable to build HTTP client: {}", source))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("Unable to submit {} to the aggregator: {}", what, source))]
    Submit { what: String, source: reqwest::Error },

    #[snafu(display("Aggregator rejected {} submission with status {}: {}", what, status, body))]
    SubmitRejected {
        what: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[snafu(display("Unable to locate a result artifact among result_files {:?} under '{}'", candidates, mount.display()))]
    NoResultArtifact {
        candidates: Vec<String>,
        mount: std::path::PathBuf,
    },

    #[snafu(display("Unable to read result artifact '{}': {}", path.display(), source))]
    ReadArtifact {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to assemble result artifact into a tarball: {}", source))]
    AssembleArtifact { source: archive::Error },

    #[snafu(display("Unable to poll for readiness file '{}': {}", path.display(), source))]
    PollReadiness {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to bind local progress relay on {}: {}", addr, source))]
    BindRelay {
        addr: std::net::SocketAddr,
        source: hyper::Error,
    },

    #[snafu(display("Local progress relay server failed: {}", source))]
    RelayServer { source: hyper::Error },
}
