use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub definitions: DefinitionsConfig,
    pub evaluation: EvaluationConfig,
    pub chart: ChartConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TABULA_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TABULA_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            definitions: DefinitionsConfig::from_env_profiled(p),
            evaluation: EvaluationConfig::from_env_profiled(p),
            chart: ChartConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  definitions: dir={}", self.definitions.dir.display());
        tracing::info!(
            "  evaluation:  cache_capacity={}, max_depth={}",
            self.evaluation.cache_capacity,
            self.evaluation.max_depth
        );
        tracing::info!(
            "  chart:       order={}, layout={}, title={}",
            self.chart.order,
            self.chart.layout,
            self.chart.title.as_deref().unwrap_or("(dataset name)")
        );
    }
}

// ── Definitions ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionsConfig {
    /// Directory scanned for `*.yml` / `*.yaml` definition files.
    pub dir: PathBuf,
}

impl DefinitionsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: PathBuf::from(profiled_env_or(p, "DEFINITIONS_DIR", "data/definitions")),
        }
    }
}

impl Default for DefinitionsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/definitions"),
        }
    }
}

// ── Evaluation ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Maximum number of cached evaluations (LRU eviction beyond this).
    pub cache_capacity: usize,
    /// Maximum nesting of definitions evaluated from inside other evaluations.
    pub max_depth: usize,
}

impl EvaluationConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            cache_capacity: profiled_env_usize(p, "EVAL_CACHE_CAPACITY", 1024),
            max_depth: profiled_env_usize(p, "EVAL_MAX_DEPTH", 32),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1024,
            max_depth: 32,
        }
    }
}

// ── Chart rendering ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// "sorted" or "insertion"
    pub order: String,
    /// Fixed chart title; the last data set name is used when unset.
    pub title: Option<String>,
    /// "density" or "fixed"
    pub layout: String,
    pub max_bar_width: u32,
    pub fixed_width: u32,
    pub fixed_height: u32,
}

impl ChartConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            order: profiled_env_or(p, "CHART_ORDER", "sorted"),
            title: profiled_env_opt(p, "CHART_TITLE"),
            layout: profiled_env_or(p, "CHART_LAYOUT", "density"),
            max_bar_width: profiled_env_u32(p, "CHART_MAX_BAR_WIDTH", 40),
            fixed_width: profiled_env_u32(p, "CHART_FIXED_WIDTH", 600),
            fixed_height: profiled_env_u32(p, "CHART_FIXED_HEIGHT", 400),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            order: "sorted".to_string(),
            title: None,
            layout: "density".to_string(),
            max_bar_width: 40,
            fixed_width: 600,
            fixed_height: 400,
        }
    }
}
