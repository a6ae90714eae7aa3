// Integration tests for the lineup predictor.
//
// These run the whole pipeline through the library's public API: load the
// fixture tables, engineer and select features, aggregate team seasons, train
// the forest, then score lineups and resolve matchups.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hoopcast_core::config::{parse_config, validate, Config, ModelConfig};
use hoopcast_core::dataset::{games_per_team, load_dataset};
use hoopcast_core::error::LineupGap;
use hoopcast_core::features::{Feature, Position};
use hoopcast_core::matchup::Side;
use hoopcast_core::roster::LineupSummary;
use hoopcast_core::scoring::{Lineup, LineupPlayer};
use hoopcast_core::{LineupPredictor, PredictorError};

use rand::SeedableRng;
use rand_pcg::Pcg64;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture tables: 20 player seasons, 4 teams x 2 seasons.
fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config_with(model: &str) -> Config {
    let text = format!(
        "\
[data]
players = \"players.csv\"
separator = \";\"
min_season_year = 2000
draft_combine = \"draft_combine.csv\"
game_log = \"game_summary.csv\"

[model]
n_trees = 100
{model}
"
    );
    let config = parse_config(&text).expect("fixture config should parse");
    validate(&config).expect("fixture config should validate");
    config
}

fn predictor() -> LineupPredictor {
    LineupPredictor::load(&config_with(""), &fixtures()).expect("pipeline should train")
}

const BOSTON_2016: [&str; 5] = [
    "Marcus Reed",
    "Devin Holt",
    "Tyrese Vance",
    "Elijah Stone",
    "Darius Webb",
];

const LAKERS: [&str; 5] = [
    "Jalen Ortiz",
    "Caleb Moss",
    "Kendall Ross",
    "Trevor Knox",
    "Xavier Lane",
];

// ===========================================================================
// Pipeline
// ===========================================================================

#[test]
fn fixture_tables_load() {
    let config = config_with("");
    let dataset = load_dataset(&config.data, &fixtures()).unwrap();
    assert_eq!(dataset.players.len(), 20);
    assert_eq!(dataset.combine.len(), 3);
    assert_eq!(dataset.game_log.len(), 3);
    assert!(dataset.combine_for("Caleb Moss").unwrap().body_fat_pct.is_none());

    let games = games_per_team(&dataset.game_log);
    assert_eq!(games[&("2015".to_string(), "BOS".to_string())], 1);
    assert_eq!(games[&("2016".to_string(), "MIA".to_string())], 1);
}

#[test]
fn end_to_end_fit_is_wired_correctly() {
    let p = predictor();
    let report = p.report();
    assert_eq!(report.rows, 8);
    assert_eq!(report.n_features, 8);
    assert_eq!(report.n_trees, 100);
    assert!(
        report.in_sample_mae < 0.1,
        "in-sample MAE {} should be below 0.1",
        report.in_sample_mae
    );
    let importance: f64 = report.feature_importances.iter().sum();
    assert!((importance - 1.0).abs() < 1e-9);
}

#[test]
fn feature_set_has_eight_distinct_candidates() {
    let p = predictor();
    let features = p.feature_set();
    assert_eq!(features.len(), 8);
    let mut names = features.names();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 8);
    // Net rating is built to track win rate almost exactly.
    assert!(features.features()[..3].contains(&Feature::NetRating));
}

#[test]
fn training_is_deterministic() {
    let a = predictor();
    let b = predictor();
    assert_eq!(a.feature_set(), b.feature_set());
    assert_eq!(a.report(), b.report());

    let lineup = a.lineup_from_names(&BOSTON_2016).unwrap();
    assert_eq!(
        a.score(&lineup).unwrap().win_rate,
        b.score(&lineup).unwrap().win_rate
    );
}

#[test]
fn engineered_table_has_no_gaps_in_candidates() {
    let p = predictor();
    for record in p.players() {
        for feature in Feature::CANDIDATES {
            assert!(record.feature(feature).is_some(), "{} {}", record.name, feature);
        }
    }
    let ortiz = p.player_index().get("Jalen Ortiz").unwrap();
    assert_eq!(ortiz.position(), Some(Position::Guard));
    let moss = p.player_index().get("Caleb Moss").unwrap();
    assert_eq!(moss.position(), Some(Position::Center));
}

// ===========================================================================
// Scoring and matchups
// ===========================================================================

#[test]
fn scores_stay_in_unit_interval() {
    let p = predictor();
    for seed in 0..10 {
        let mut rng = Pcg64::seed_from_u64(seed);
        let lineup = p.random_lineup(&mut rng).unwrap();
        assert_eq!(lineup.len(), 5);
        let score = p.score(&lineup).unwrap();
        assert!((0.0..=1.0).contains(&score.win_rate), "{}", score.win_rate);
    }
}

#[test]
fn stronger_roster_beats_weaker_roster() {
    let p = predictor();
    let boston = p.lineup_from_names(&BOSTON_2016).unwrap();
    let lakers = p.lineup_from_names(&LAKERS).unwrap();

    let outcome = p.predict_winner(&lakers, &boston).unwrap();
    assert_eq!(outcome.winner, Side::B);
    assert_eq!(outcome.winner_lineup, &boston);
    assert!(outcome.winner_score > outcome.loser_score);

    let swapped = p.predict_winner(&boston, &lakers).unwrap();
    assert_eq!(swapped.winner, Side::A);
    assert_eq!(swapped.winner_score, outcome.winner_score);
}

#[test]
fn identical_lineups_tie_to_the_second() {
    let p = predictor();
    let a = p.lineup_from_names(&BOSTON_2016).unwrap();
    let b = a.clone();
    let outcome = p.predict_winner(&a, &b).unwrap();
    assert_eq!(outcome.winner, Side::B);
    assert!(std::ptr::eq(outcome.winner_lineup, &b));
    assert_eq!(outcome.winner_score, outcome.loser_score);
    assert_eq!(outcome.winner_desc, outcome.loser_desc);
}

#[test]
fn team_lineup_uses_latest_season_scorers() {
    let p = predictor();
    let nyk = p.team_lineup("NYK").unwrap();
    assert_eq!(nyk.names(), vec!["Owen Pratt", "Rasheed Cobb", "Quentin Ward"]);
    // Three players is not a lineup.
    assert!(matches!(
        p.score(&nyk),
        Err(PredictorError::IncompleteLineup {
            gap: LineupGap::Size { players: 3 }
        })
    ));
}

#[test]
fn hand_built_lineup_without_selected_feature_is_rejected() {
    let p = predictor();
    let missing = p.feature_set().features()[0];
    let players = (0..5)
        .map(|i| {
            let mut player = LineupPlayer::new(&format!("Custom {i}"), "BOS", Some(Position::Guard));
            for f in p.feature_set().iter().filter(|f| *f != missing) {
                player = player.with_feature(f, 1.0);
            }
            player
        })
        .collect();
    match p.score(&Lineup::new(players)) {
        Err(PredictorError::IncompleteLineup {
            gap: LineupGap::Feature { player, feature },
        }) => {
            assert_eq!(player, "Custom 0");
            assert_eq!(feature, missing);
        }
        other => panic!("expected IncompleteLineup, got {other:?}"),
    }
}

#[test]
fn lineup_players_carry_combine_measurements() {
    let p = predictor();
    let lineup = p.lineup_from_names(&BOSTON_2016).unwrap();
    let reed = &lineup.players[0];
    assert_eq!(reed.name, "Marcus Reed");
    assert_eq!(reed.combine.as_ref().unwrap().height_cm, Some(190.5));
    assert!(lineup.players[1].combine.is_none());

    let summary = LineupSummary::of(&lineup);
    assert!(summary.total_points > 0.0);
    assert!(summary.team_ast_usg > 0.0);
}

#[test]
fn predictor_can_be_shared_across_threads() {
    let p = Arc::new(predictor());
    let lineup = p.lineup_from_names(&LAKERS).unwrap();
    let expected = p.score(&lineup).unwrap().win_rate;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let p = Arc::clone(&p);
            let lineup = lineup.clone();
            std::thread::spawn(move || p.score(&lineup).unwrap().win_rate)
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}

// ===========================================================================
// Error paths
// ===========================================================================

#[test]
fn unknown_player_is_reported() {
    let p = predictor();
    let err = p
        .lineup_from_names(&["Marcus Reed", "Nobody Here"])
        .unwrap_err();
    assert!(matches!(err, PredictorError::UnknownPlayer { ref name } if name == "Nobody Here"));
}

#[test]
fn missing_player_table_is_data_unavailable() {
    let mut config = config_with("");
    config.data.players = "does_not_exist.csv".into();
    match LineupPredictor::load(&config, &fixtures()) {
        Err(PredictorError::DataUnavailable { path, .. }) => {
            assert!(path.ends_with("does_not_exist.csv"));
        }
        other => panic!("expected DataUnavailable, got {other:?}"),
    }
}

#[test]
fn missing_optional_tables_are_tolerated() {
    let mut config = config_with("");
    config.data.draft_combine = Some("nope.csv".into());
    config.data.game_log = None;
    let p = LineupPredictor::load(&config, &fixtures()).unwrap();
    assert!(p.dataset().combine.is_empty());
    assert!(p.dataset().game_log.is_empty());
}

#[test]
fn too_few_team_seasons_is_insufficient_data() {
    let config = config_with("min_training_rows = 9");
    match LineupPredictor::load(&config, &fixtures()) {
        Err(PredictorError::InsufficientData { rows, minimum }) => {
            assert_eq!(rows, 8);
            assert_eq!(minimum, 9);
        }
        other => panic!("expected InsufficientData, got {other:?}"),
    }
}

#[test]
fn season_filter_can_empty_the_training_set() {
    let mut config = config_with("");
    config.data.min_season_year = 2016;
    let model = ModelConfig {
        n_trees: 10,
        ..config.model.clone()
    };
    config.model = model;
    // Four team seasons remain, below the default minimum of five.
    assert!(matches!(
        LineupPredictor::load(&config, &fixtures()),
        Err(PredictorError::InsufficientData { rows: 4, minimum: 5 })
    ));
}
