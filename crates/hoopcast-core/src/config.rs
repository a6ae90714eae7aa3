// Configuration loading and parsing (predictor.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::features::Feature;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

/// Wrapper for the whole predictor.toml file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub lineup: LineupConfig,
}

// ---------------------------------------------------------------------------
// [data]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Player-season CSV (one row per player per season).
    pub players: String,
    /// Field separator for the player-season CSV. The source exports use `;`.
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_min_season_year")]
    pub min_season_year: i32,
    /// Draft-combine measurements. Display only.
    #[serde(default)]
    pub draft_combine: Option<String>,
    /// Game summary log. Display only.
    #[serde(default)]
    pub game_log: Option<String>,
}

impl DataConfig {
    /// The separator as a single byte. Only valid after `validate` has run.
    pub fn separator_byte(&self) -> u8 {
        self.separator.as_bytes().first().copied().unwrap_or(b';')
    }
}

fn default_separator() -> String {
    ";".into()
}

fn default_min_season_year() -> i32 {
    2000
}

// ---------------------------------------------------------------------------
// [model]
// ---------------------------------------------------------------------------

/// Training hyper-parameters. Defaults are 200 trees of depth 10, seed 42,
/// and the top 8 features averaged over each team's top 5 scorers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub seed: u64,
    /// Smallest number of team-season rows the trainer accepts.
    pub min_training_rows: usize,
    pub top_k_features: usize,
    pub top_n_scorers: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            seed: 42,
            min_training_rows: 5,
            top_k_features: 8,
            top_n_scorers: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// [lineup]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineupConfig {
    /// Random lineups are drawn from this many most efficient players.
    pub random_pool_size: usize,
}

impl Default for LineupConfig {
    fn default() -> Self {
        Self {
            random_pool_size: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

const CONFIG_FILE: &str = "predictor.toml";

/// Load and validate configuration from `config/predictor.toml` relative to
/// the given `base_dir`.
///
/// This does not copy defaults. Prefer `load_config()` which does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config = parse_config(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Parse a config document without validating it.
pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

/// Ensure `config/predictor.toml` exists by copying it from `defaults/`.
/// Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let source = defaults_dir.join(CONFIG_FILE);
    let target = config_dir.join(CONFIG_FILE);
    if !source.is_file() || target.exists() {
        return Ok(vec![]);
    }

    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", source.display()),
    })?;
    Ok(vec![target])
}

/// Convenience wrapper: copies defaults if needed, then loads config from
/// `base_dir`.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let sep = &config.data.separator;
    if sep.len() != 1 || !sep.is_ascii() {
        return Err(ConfigError::ValidationError {
            field: "data.separator".into(),
            message: format!("must be a single ASCII character, got {sep:?}"),
        });
    }

    if config.data.players.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data.players".into(),
            message: "must not be empty".into(),
        });
    }

    validate_model(&config.model)?;

    if config.lineup.random_pool_size < 5 {
        return Err(ConfigError::ValidationError {
            field: "lineup.random_pool_size".into(),
            message: format!(
                "must be at least 5, got {}",
                config.lineup.random_pool_size
            ),
        });
    }

    Ok(())
}

pub fn validate_model(model: &ModelConfig) -> Result<(), ConfigError> {
    let positive_fields: &[(&str, usize)] = &[
        ("model.n_trees", model.n_trees),
        ("model.max_depth", model.max_depth),
        ("model.min_training_rows", model.min_training_rows),
        ("model.top_k_features", model.top_k_features),
        ("model.top_n_scorers", model.top_n_scorers),
    ];
    for (name, val) in positive_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    if model.top_k_features > Feature::CANDIDATES.len() {
        return Err(ConfigError::ValidationError {
            field: "model.top_k_features".into(),
            message: format!(
                "must be at most {}, got {}",
                Feature::CANDIDATES.len(),
                model.top_k_features
            ),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .unwrap()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    const MINIMAL: &str = "\
[data]
players = \"players.csv\"
";

    #[test]
    fn defaults_file_parses_and_validates() {
        let text = fs::read_to_string(project_root().join("defaults/predictor.toml"))
            .expect("defaults/predictor.toml should exist");
        let config = parse_config(&text).expect("defaults should parse");
        validate(&config).expect("defaults should validate");

        assert_eq!(config.data.players, "data/players.csv");
        assert_eq!(config.data.separator, ";");
        assert_eq!(config.data.min_season_year, 2000);
        assert_eq!(config.model.n_trees, 200);
        assert_eq!(config.model.max_depth, 10);
        assert_eq!(config.model.seed, 42);
        assert_eq!(config.model.top_k_features, 8);
        assert_eq!(config.model.top_n_scorers, 5);
        assert_eq!(config.lineup.random_pool_size, 100);
    }

    #[test]
    fn omitted_sections_use_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.data.separator, ";");
        assert_eq!(config.data.min_season_year, 2000);
        assert!(config.data.draft_combine.is_none());
        assert!(config.data.game_log.is_none());
        assert_eq!(config.model.n_trees, 200);
        assert_eq!(config.model.min_training_rows, 5);
        assert_eq!(config.lineup.random_pool_size, 100);
    }

    #[test]
    fn partial_model_section_fills_remaining_defaults() {
        let text = format!("{MINIMAL}\n[model]\nn_trees = 20\n");
        let config = parse_config(&text).unwrap();
        assert_eq!(config.model.n_trees, 20);
        assert_eq!(config.model.max_depth, 10);
        assert_eq!(config.model.seed, 42);
    }

    #[test]
    fn rejects_multi_char_separator() {
        let text = "[data]\nplayers = \"p.csv\"\nseparator = \";;\"\n";
        let config = parse_config(text).unwrap();
        match validate(&config) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "data.separator")
            }
            other => panic!("expected separator validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_trees() {
        let text = format!("{MINIMAL}\n[model]\nn_trees = 0\n");
        let config = parse_config(&text).unwrap();
        match validate(&config) {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "model.n_trees"),
            other => panic!("expected n_trees validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_top_k_above_candidate_count() {
        let text = format!("{MINIMAL}\n[model]\ntop_k_features = 15\n");
        let config = parse_config(&text).unwrap();
        match validate(&config) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "model.top_k_features")
            }
            other => panic!("expected top_k validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_tiny_random_pool() {
        let text = format!("{MINIMAL}\n[lineup]\nrandom_pool_size = 4\n");
        let config = parse_config(&text).unwrap();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let tmp = scratch_dir("hoopcast_config_missing");
        match load_config_from(&tmp) {
            Err(ConfigError::FileNotFound { path }) => {
                assert!(path.ends_with("config/predictor.toml"))
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let tmp = scratch_dir("hoopcast_config_malformed");
        fs::write(tmp.join("config/predictor.toml"), "[data\nplayers = 1").unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ParseError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_defaults_once() {
        let tmp = scratch_dir("hoopcast_config_copy");
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/predictor.toml"), MINIMAL).unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/predictor.toml").exists());

        // Second call leaves the user's copy alone.
        fs::write(
            tmp.join("config/predictor.toml"),
            "[data]\nplayers = \"mine.csv\"\n",
        )
        .unwrap();
        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.data.players, "mine.csv");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_without_any_directory() {
        let tmp = std::env::temp_dir().join("hoopcast_config_empty_base");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}
