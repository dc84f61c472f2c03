use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Plugin name '{}' is invalid: must match [a-z0-9-]+", name))]
    InvalidPluginName { name: String },

    #[snafu(display("Plugin '{}' is missing required field '{}'", name, field))]
    MissingField { name: String, field: String },

    #[snafu(display("Plugin '{}' declared node_selector but has driver Job, which always produces a single global result", name))]
    JobWithNodeSelector { name: String },

    #[snafu(display("Duplicate plugin name '{}'", name))]
    DuplicatePlugin { name: String },

    #[snafu(display("Unable to render plugin template for '{}': unknown token '{{{}}}'", plugin_name, token))]
    UnknownTemplateToken { plugin_name: String, token: String },

    #[snafu(display("Unable to parse config: {}", source))]
    ParseConfig { source: serde_json::Error },

    #[snafu(display("Unable to read config file '{}': {}", path, source))]
    ReadConfigFile {
        path: String,
        source: std::io::Error,
    },
}
