//! Companion installer repository: git checkout and artifact lookup.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::system::{run_strict, Runner};

const BINARY_CANDIDATES: &[&str] = &["bifrost", "bin/bifrost", "release/bifrost"];

const CONFIG_CANDIDATES: &[&str] = &[
    "config.yaml",
    "config.yml",
    "templates/config.yaml",
    "conf/config.yaml",
];

const ENV_CANDIDATES: &[&str] = &["bifrost.env", "templates/bifrost.env"];

/// Clones `url` into `dir`, or fast-forwards an existing checkout.
pub fn sync(runner: &dyn Runner, url: Option<&str>, dir: &Path) -> Result<()> {
    let dir_str = dir.to_string_lossy();

    if dir.join(".git").is_dir() {
        info!("updating {}", dir.display());
        run_strict(runner, "git", &["-C", &dir_str, "pull", "--ff-only"])?;
        return Ok(());
    }

    let url = url.ok_or(Error::RepoUrlMissing)?;
    info!("cloning {} into {}", url, dir.display());
    run_strict(runner, "git", &["clone", "--depth", "1", url, &dir_str])?;
    Ok(())
}

fn find(dir: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|c| dir.join(c))
        .find(|p| p.is_file())
}

fn require(dir: &Path, what: &'static str, candidates: &[&str]) -> Result<PathBuf> {
    find(dir, candidates).ok_or_else(|| Error::MissingArtifact {
        what,
        dir: dir.to_path_buf(),
        candidates: candidates.join(", "),
    })
}

pub fn binary(dir: &Path) -> Result<PathBuf> {
    require(dir, "bifrost binary", BINARY_CANDIDATES)
}

pub fn config_template(dir: &Path) -> Result<PathBuf> {
    require(dir, "config template", CONFIG_CANDIDATES)
}

pub fn env_template(dir: &Path) -> Option<PathBuf> {
    find(dir, ENV_CANDIDATES)
}
