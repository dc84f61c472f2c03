use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to enumerate nodes for plugin '{}': {}", plugin, source))]
    EnumerateNodes { plugin: String, source: k8sclient::Error },

    #[snafu(display("Unable to issue run certificate authority: {}", source))]
    Launcher { source: launcher::Error },

    #[snafu(display("Unable to bind aggregation server: {}", source))]
    Aggregator { source: aggregator::Error },

    #[snafu(display("Startup phase failed before any workload was scheduled: {}", message))]
    Startup { message: String },

    #[snafu(display("All plugins failed during launch"))]
    AllPluginsFailed,

    #[snafu(display("Invalid plugin set: {}", source))]
    InvalidPlugins { source: model::Error },
}

impl From<launcher::Error> for Error {
    fn from(source: launcher::Error) -> Self {
        Error::Launcher { source }
    }
}

impl From<aggregator::Error> for Error {
    fn from(source: aggregator::Error) -> Self {
        Error::Aggregator { source }
    }
}
