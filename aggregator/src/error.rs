use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to bind aggregation server to {}: {}", addr, source))]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[snafu(display("Unable to build TLS server configuration: {}", source))]
    TlsConfig { source: rustls::Error },

    #[snafu(display("Unable to parse certificate material: {}", message))]
    TlsMaterial { message: String },

    #[snafu(display("Slot owner actor is no longer running"))]
    OwnerGone,

    #[snafu(display("Unable to write submitted artifact for '{}': {}", slot, source))]
    WriteArtifact {
        slot: String,
        source: std::io::Error,
    },
}
