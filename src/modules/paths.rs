use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use crate::config::{AppConfig, DEFAULT_REFS_DIR, NOTES_FILE, RECOMMENDATIONS_FILE};

pub fn repo_root() -> Option<PathBuf> {
    static CACHED: OnceLock<Option<PathBuf>> = OnceLock::new();
    CACHED.get_or_init(repo_root_uncached).as_ref().cloned()
}

fn repo_root_uncached() -> Option<PathBuf> {
    let out = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(PathBuf::from(s))
    }
}

/// `PERFREVIEW_REFS_DIR`, else `<git root>/references` when it exists, else `./references`.
pub fn resolve_refs_dir(cfg: &AppConfig) -> PathBuf {
    if let Some(dir) = &cfg.refs_dir {
        return dir.clone();
    }
    if let Some(root) = repo_root() {
        let candidate = root.join(DEFAULT_REFS_DIR);
        if candidate.is_dir() {
            return candidate;
        }
    }
    PathBuf::from(DEFAULT_REFS_DIR)
}

fn resolve_in_refs(cfg: &AppConfig, explicit: Option<&Path>, file: &str) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => resolve_refs_dir(cfg).join(file),
    }
}

pub fn resolve_recommendations_file(cfg: &AppConfig, cli_override: Option<&Path>) -> PathBuf {
    let explicit = cli_override.or(cfg.recommendations_file.as_deref());
    resolve_in_refs(cfg, explicit, RECOMMENDATIONS_FILE)
}

pub fn resolve_notes_file(cfg: &AppConfig, cli_override: Option<&Path>) -> PathBuf {
    let explicit = cli_override.or(cfg.notes_file.as_deref());
    resolve_in_refs(cfg, explicit, NOTES_FILE)
}
