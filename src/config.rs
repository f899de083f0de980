use std::path::PathBuf;
use std::time::Duration;

use crate::features::{FeatureConfig, WindowPolicy};
use crate::rate_limit::DEFAULT_REQUEST_INTERVAL;
use crate::roster::parse_season_list;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MODEL_PATH: &str = "models/xgboost_points_model.json";
pub const DEFAULT_ENCODER_PATH: &str = "models/opponent_encoder.json";

/// Runtime settings resolved from `.env` files, the environment and flags,
/// in increasing order of precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub encoder_path: PathBuf,
    pub roster_path: Option<PathBuf>,
    pub seasons: Option<Vec<String>>,
    pub request_interval: Duration,
    pub sqlite_path: Option<PathBuf>,
    pub http_cache: bool,
    pub features: FeatureConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            encoder_path: PathBuf::from(DEFAULT_ENCODER_PATH),
            roster_path: None,
            seasons: None,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            sqlite_path: None,
            http_cache: true,
            features: FeatureConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `.env.local` and `.env` (missing files are fine), then reads the
    /// `BASKETSTAT_*` variables.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BASKETSTAT_DATA_DIR") {
            cfg.data_dir = PathBuf::from(v.trim());
        }
        if let Some(v) = get("BASKETSTAT_MODEL_PATH") {
            cfg.model_path = PathBuf::from(v.trim());
        }
        if let Some(v) = get("BASKETSTAT_ENCODER_PATH") {
            cfg.encoder_path = PathBuf::from(v.trim());
        }
        cfg.roster_path = get("BASKETSTAT_ROSTER_PATH").map(|v| PathBuf::from(v.trim()));
        cfg.seasons = get("BASKETSTAT_SEASONS")
            .map(|v| parse_season_list(&v))
            .filter(|s| !s.is_empty());
        if let Some(ms) = get("BASKETSTAT_REQUEST_INTERVAL_MS").and_then(|v| v.trim().parse().ok())
        {
            cfg.request_interval = Duration::from_millis(ms);
        }
        cfg.sqlite_path = get("BASKETSTAT_SQLITE_PATH").map(|v| PathBuf::from(v.trim()));
        if let Some(v) = get("BASKETSTAT_HTTP_CACHE") {
            cfg.http_cache = parse_switch(&v).unwrap_or(true);
        }
        if let Some(policy) = get("BASKETSTAT_ROLLING_POLICY").and_then(|v| WindowPolicy::parse(&v))
        {
            cfg.features.policy = policy;
        }
        cfg
    }

    /// Applies the flags shared by the binaries on top of the environment.
    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(v) = arg_value(args, "--data-dir") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = arg_value(args, "--model") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = arg_value(args, "--encoder") {
            self.encoder_path = PathBuf::from(v);
        }
        if let Some(v) = arg_value(args, "--roster") {
            self.roster_path = Some(PathBuf::from(v));
        }
        if let Some(v) = arg_value(args, "--seasons") {
            let seasons = parse_season_list(&v);
            if !seasons.is_empty() {
                self.seasons = Some(seasons);
            }
        }
        if let Some(ms) = arg_value(args, "--interval-ms").and_then(|v| v.parse().ok()) {
            self.request_interval = Duration::from_millis(ms);
        }
        if let Some(v) = arg_value(args, "--sqlite") {
            self.sqlite_path = Some(PathBuf::from(v));
        }
        if has_flag(args, "--no-cache") {
            self.http_cache = false;
        }
        if let Some(policy) = arg_value(args, "--rolling").and_then(|v| WindowPolicy::parse(&v)) {
            self.features.policy = policy;
        }
    }
}

/// `--name value` or `--name=value`; blank values are ignored.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

pub fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
