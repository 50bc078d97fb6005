use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Canonical application identity (used by help/version surfaces).
pub const APP_NAME: &str = "perfreview";
pub const APP_DESC: &str = "Weekly agent performance review recommendations";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Canonical runtime defaults.
pub const DEFAULT_REFS_DIR: &str = "references";
pub const RECOMMENDATIONS_FILE: &str = "recommendations.json";
pub const NOTES_FILE: &str = "roasts.json";
pub const DEFAULT_LOG_FILTER: &str = "perfreview=warn";

/// Process-level configuration snapshot.
///
/// Loaded once by the CLI. The engine never reads it; catalogs are passed in.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub refs_dir: Option<PathBuf>,
    pub recommendations_file: Option<PathBuf>,
    pub notes_file: Option<PathBuf>,
    pub log_filter: String,
}

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

fn env_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            refs_dir: env_path("PERFREVIEW_REFS_DIR"),
            recommendations_file: env_path("PERFREVIEW_RECOMMENDATIONS"),
            notes_file: env_path("PERFREVIEW_NOTES"),
            log_filter: env_string("PERFREVIEW_LOG", DEFAULT_LOG_FILTER),
        }
    }
}

pub fn app_config() -> &'static AppConfig {
    APP_CONFIG.get_or_init(AppConfig::from_env)
}
