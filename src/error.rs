use std::io;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Must run as root")]
    NotRoot,

    #[error("{what} not found in {dir} (looked for: {candidates})")]
    MissingArtifact {
        what: &'static str,
        dir: PathBuf,
        candidates: String,
    },

    #[error("Not installed: {0} is missing")]
    NotInstalled(PathBuf),

    #[error("Installer repository URL not set (use --repo-url or BIFROST_REPO_URL)")]
    RepoUrlMissing,

    #[error("Unknown key '{0}' (expected one of: listen_ip, src_ip, dst_ip, address, protocol, port)")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("`{cmd}` failed: {detail}")]
    Command { cmd: String, detail: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("Terminal I/O: {0}")]
    Terminal(#[from] io::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
        move |source| Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
