use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to read submitted artifact directory '{}': {}", path.display(), source))]
    ReadDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to read artifact file '{}': {}", path.display(), source))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse JUnit XML in '{}': {}", path.display(), source))]
    ParseJunit {
        path: std::path::PathBuf,
        source: quick_xml::Error,
    },

    #[snafu(display("Unable to parse manual result YAML in '{}': {}", path.display(), source))]
    ParseManual {
        path: std::path::PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("Unable to extract submitted tarball '{}': {}", path.display(), source))]
    ExtractArtifact {
        path: std::path::PathBuf,
        source: archive::Error,
    },

    #[snafu(display("Unable to serialize result tree for plugin '{}': {}", plugin, source))]
    SerializeTree { plugin: String, source: serde_yaml::Error },

    #[snafu(display("Unable to write result tree for plugin '{}': {}", plugin, source))]
    WriteTree {
        plugin: String,
        source: std::io::Error,
    },
}
