// Player-season data loading.
//
// Reads the season export (one row per player per season, `;`-separated) and
// the optional draft-combine and game-summary tables. Only the player table
// feeds the model; the other two are carried along for display.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::DataConfig;
use crate::error::PredictorError;
use crate::features::{DerivedStats, Position};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player's season. Raw stats are `None` when the source cell was empty,
/// unparseable or non-finite; nothing is stored as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonRecord {
    pub name: String,
    pub team: String,
    /// Season label as exported, e.g. "2015-16".
    pub season: String,
    pub season_year: i32,
    /// Free-text position ("Guard", "Forward-Center", ...).
    pub position_text: Option<String>,
    pub gp: Option<f64>,
    pub pts: Option<f64>,
    pub reb: Option<f64>,
    pub ast: Option<f64>,
    pub oreb_pct: Option<f64>,
    pub dreb_pct: Option<f64>,
    pub usg_pct: Option<f64>,
    pub ts_pct: Option<f64>,
    pub ast_pct: Option<f64>,
    pub net_rating: Option<f64>,
    /// Team win rate for the season, in [0, 1].
    pub win_rate: Option<f64>,
    /// Filled in by the feature engineer.
    pub derived: DerivedStats,
}

impl PlayerSeasonRecord {
    /// A record with identity fields set and every stat missing.
    pub fn new(name: &str, team: &str, season: &str) -> Self {
        Self {
            name: name.to_string(),
            team: team.to_string(),
            season: season.to_string(),
            season_year: season_year(season).unwrap_or_default(),
            position_text: None,
            gp: None,
            pts: None,
            reb: None,
            ast: None,
            oreb_pct: None,
            dreb_pct: None,
            usg_pct: None,
            ts_pct: None,
            ast_pct: None,
            net_rating: None,
            win_rate: None,
            derived: DerivedStats::default(),
        }
    }

    pub fn position(&self) -> Option<Position> {
        self.derived.position
    }
}

/// Draft-combine measurements for one player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CombineRecord {
    #[serde(rename = "player_name")]
    pub name: String,
    #[serde(rename = "height_wo_shoes_cm", default, deserialize_with = "csv::invalid_option")]
    pub height_cm: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub wingspan_cm: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub standing_reach_cm: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub body_fat_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub standing_vertical_leap: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub max_vertical_leap: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub lane_agility_time: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub three_quarter_sprint: Option<f64>,
}

/// One game from the summary log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameLogRecord {
    pub season: String,
    pub game_id: String,
    pub home_team_id: String,
    pub visitor_team_id: String,
}

/// Everything the loader read, season-filtered.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub players: Vec<PlayerSeasonRecord>,
    pub combine: Vec<CombineRecord>,
    pub game_log: Vec<GameLogRecord>,
}

impl Dataset {
    pub fn from_players(players: Vec<PlayerSeasonRecord>) -> Self {
        Self {
            players,
            ..Self::default()
        }
    }

    /// First combine entry for an exact player name.
    pub fn combine_for(&self, name: &str) -> Option<&CombineRecord> {
        self.combine.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// Player-season CSV row. Numeric cells that fail to parse become `None`
/// rather than failing the row, so one bad cell never drops a player.
#[derive(Debug, Deserialize)]
struct RawPlayerSeason {
    player_name: String,
    team_abbreviation: String,
    season: String,
    #[serde(default)]
    position: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    gp: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pts: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    reb: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    ast: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    oreb_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    dreb_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    usg_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    ts_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    ast_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    net_rating: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    win_rate: Option<f64>,
}

const REQUIRED_PLAYER_COLUMNS: [&str; 3] = ["player_name", "team_abbreviation", "season"];

#[derive(Debug, thiserror::Error)]
enum TableError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("missing required column(s): {0}")]
    MissingColumns(String),
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Season year from a label such as "2015-16": the first four characters as
/// an integer.
pub fn season_year(season: &str) -> Option<i32> {
    season.trim().get(..4)?.parse().ok()
}

/// Drops NaN and infinities.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn reader_builder(separator: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(separator).trim(csv::Trim::All);
    builder
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_players_from_reader<R: Read>(
    rdr: R,
    separator: u8,
    min_season_year: i32,
) -> Result<Vec<PlayerSeasonRecord>, TableError> {
    let mut reader = reader_builder(separator).from_reader(rdr);

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_PLAYER_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(TableError::MissingColumns(missing.join(", ")));
    }

    let mut players = Vec::new();
    let mut filtered = 0usize;
    for result in reader.deserialize::<RawPlayerSeason>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };
        let Some(year) = season_year(&raw.season) else {
            warn!(
                "skipping '{}': unparseable season label '{}'",
                raw.player_name, raw.season
            );
            continue;
        };
        if year < min_season_year {
            filtered += 1;
            continue;
        }
        players.push(PlayerSeasonRecord {
            name: raw.player_name,
            team: raw.team_abbreviation,
            season: raw.season,
            season_year: year,
            position_text: non_blank(raw.position),
            gp: finite(raw.gp),
            pts: finite(raw.pts),
            reb: finite(raw.reb),
            ast: finite(raw.ast),
            oreb_pct: finite(raw.oreb_pct),
            dreb_pct: finite(raw.dreb_pct),
            usg_pct: finite(raw.usg_pct),
            ts_pct: finite(raw.ts_pct),
            ast_pct: finite(raw.ast_pct),
            net_rating: finite(raw.net_rating),
            win_rate: finite(raw.win_rate),
            derived: DerivedStats::default(),
        });
    }
    debug!(
        "dropped {} player rows before season {}",
        filtered, min_season_year
    );
    Ok(players)
}

fn load_combine_from_reader<R: Read>(rdr: R) -> Result<Vec<CombineRecord>, TableError> {
    let mut reader = reader_builder(b',').from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<CombineRecord>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("skipping malformed combine row: {}", e),
        }
    }
    Ok(rows)
}

fn load_game_log_from_reader<R: Read>(rdr: R) -> Result<Vec<GameLogRecord>, TableError> {
    let mut reader = reader_builder(b',').from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<GameLogRecord>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("skipping malformed game row: {}", e),
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, PredictorError> {
    std::fs::File::open(path).map_err(|e| PredictorError::unavailable(path, e))
}

/// Load player seasons from `path`, keeping seasons at or after
/// `min_season_year`.
pub fn load_player_seasons(
    path: &Path,
    separator: u8,
    min_season_year: i32,
) -> Result<Vec<PlayerSeasonRecord>, PredictorError> {
    let file = open(path)?;
    load_players_from_reader(file, separator, min_season_year)
        .map_err(|e| PredictorError::unavailable(path, e))
}

pub fn load_combine(path: &Path) -> Result<Vec<CombineRecord>, PredictorError> {
    let file = open(path)?;
    load_combine_from_reader(file).map_err(|e| PredictorError::unavailable(path, e))
}

pub fn load_game_log(path: &Path) -> Result<Vec<GameLogRecord>, PredictorError> {
    let file = open(path)?;
    load_game_log_from_reader(file).map_err(|e| PredictorError::unavailable(path, e))
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Optional display tables never fail the load: a missing or unreadable file
/// is logged and treated as empty.
fn load_optional<T>(
    label: &str,
    base_dir: &Path,
    path: Option<&str>,
    load: impl FnOnce(&Path) -> Result<Vec<T>, PredictorError>,
) -> Vec<T> {
    let Some(path) = path else {
        debug!("no {} table configured", label);
        return Vec::new();
    };
    match load(&resolve(base_dir, path)) {
        Ok(rows) => {
            info!("Loaded {} {} rows", rows.len(), label);
            rows
        }
        Err(e) => {
            warn!("{} table ignored: {}", label, e);
            Vec::new()
        }
    }
}

/// Load every configured table. Relative paths resolve against `base_dir`.
pub fn load_dataset(data: &DataConfig, base_dir: &Path) -> Result<Dataset, PredictorError> {
    let players_path = resolve(base_dir, &data.players);
    let players =
        load_player_seasons(&players_path, data.separator_byte(), data.min_season_year)?;
    info!(
        "Loaded {} player seasons from {} (season >= {})",
        players.len(),
        players_path.display(),
        data.min_season_year
    );

    let combine = load_optional("draft combine", base_dir, data.draft_combine.as_deref(), load_combine);
    let game_log = load_optional("game log", base_dir, data.game_log.as_deref(), load_game_log);

    Ok(Dataset {
        players,
        combine,
        game_log,
    })
}

/// Games played per (season, team id), counting home and away appearances.
pub fn games_per_team(games: &[GameLogRecord]) -> BTreeMap<(String, String), usize> {
    let mut counts = BTreeMap::new();
    for game in games {
        for team in [&game.home_team_id, &game.visitor_team_id] {
            *counts
                .entry((game.season.clone(), team.clone()))
                .or_insert(0) += 1;
        }
    }
    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
