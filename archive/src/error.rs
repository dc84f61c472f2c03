use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to walk results directory '{}': {}", path.display(), source))]
    Walk {
        path: std::path::PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("Unable to add archive member '{}': {}", path, source))]
    AddMember { path: String, source: std::io::Error },

    #[snafu(display("Unable to finish archive: {}", source))]
    Finish { source: std::io::Error },

    #[snafu(display("Unable to read archive entry: {}", source))]
    ReadEntry { source: std::io::Error },

    #[snafu(display("Refusing to extract unsafe archive member path '{}'", path))]
    UnsafeMemberPath { path: String },

    #[snafu(display("Unable to extract archive member '{}': {}", path, source))]
    Extract { path: String, source: std::io::Error },
}
