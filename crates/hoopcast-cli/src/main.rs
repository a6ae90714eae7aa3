// Lineup predictor entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load tables and train the predictor
// 4. Run the requested command and print the result

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use hoopcast_core::config;
use hoopcast_core::matchup::{self, MatchupOutcome};
use hoopcast_core::roster::LineupSummary;
use hoopcast_core::scoring::{Lineup, LineupScore};
use hoopcast_core::LineupPredictor;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Predict which of two basketball lineups wins", long_about = None)]
struct CommandArgs {
    /// Directory holding `config/` (or `defaults/`) and the data files
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Score two lineups and predict the winner (default)
    Matchup(#[clap(flatten)] MatchupArg),
    /// Show the selected features and the training fit
    Features,
    /// Per-team averages across all seasons
    Teams,
}

#[derive(Default, Debug, Clone, Args)]
struct MatchupArg {
    /// Comma-separated player names for lineup A
    #[arg(long)]
    team_a: Option<String>,
    /// Comma-separated player names for lineup B
    #[arg(long)]
    team_b: Option<String>,
    /// Use a team's leading scorers as lineup A
    #[arg(long, conflicts_with = "team_a")]
    club_a: Option<String>,
    /// Use a team's leading scorers as lineup B
    #[arg(long, conflicts_with = "team_b")]
    club_b: Option<String>,
    /// Seed for random lineups
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = CommandArgs::parse();

    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("hoopcast starting up");

    // 2. Load config
    let config = config::load_config(&args.config_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: players={}, {} trees, depth {}",
        config.data.players, config.model.n_trees, config.model.max_depth
    );

    // 3. Load tables and train
    let predictor = LineupPredictor::load(&config, &args.config_dir)
        .with_context(|| format!("failed to build predictor from {}", args.config_dir.display()))?;

    // 4. Run the command
    match args.mode.unwrap_or(Mode::Matchup(MatchupArg::default())) {
        Mode::Matchup(arg) => run_matchup(&predictor, &arg, args.json)?,
        Mode::Features => run_features(&predictor, args.json)?,
        Mode::Teams => run_teams(&predictor, args.json)?,
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn parse_names(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn pick_lineup(
    predictor: &LineupPredictor,
    names: Option<&str>,
    club: Option<&str>,
    rng: &mut Pcg64,
) -> anyhow::Result<Lineup> {
    if let Some(list) = names {
        let names = parse_names(list);
        if names.len() != 5 {
            bail!("a lineup needs exactly 5 players, got {} in {list:?}", names.len());
        }
        return predictor
            .lineup_from_names(&names)
            .context("failed to build lineup");
    }
    if let Some(team) = club {
        return predictor
            .team_lineup(team)
            .with_context(|| format!("failed to build lineup for {team}"));
    }
    predictor
        .random_lineup(rng)
        .context("failed to draw a random lineup")
}

#[derive(Serialize)]
struct SideReport<'a> {
    lineup: &'a Lineup,
    score: &'a LineupScore,
    summary: LineupSummary,
}

#[derive(Serialize)]
struct MatchupReport<'a> {
    a: SideReport<'a>,
    b: SideReport<'a>,
    outcome: &'a MatchupOutcome<'a>,
}

fn run_matchup(predictor: &LineupPredictor, arg: &MatchupArg, json: bool) -> anyhow::Result<()> {
    let seed = arg.seed.unwrap_or_else(rand::random);
    let mut rng = Pcg64::seed_from_u64(seed);
    info!("Lineup seed {}", seed);

    let a = pick_lineup(predictor, arg.team_a.as_deref(), arg.club_a.as_deref(), &mut rng)?;
    let b = pick_lineup(predictor, arg.team_b.as_deref(), arg.club_b.as_deref(), &mut rng)?;

    let score_a = predictor.score(&a).context("failed to score lineup A")?;
    let score_b = predictor.score(&b).context("failed to score lineup B")?;
    let outcome = matchup::resolve((&a, &score_a), (&b, &score_b));

    if json {
        let report = MatchupReport {
            a: SideReport {
                lineup: &a,
                score: &score_a,
                summary: LineupSummary::of(&a),
            },
            b: SideReport {
                lineup: &b,
                score: &score_b,
                summary: LineupSummary::of(&b),
            },
            outcome: &outcome,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_side("Team A", &a, &score_a);
    print_side("Team B", &b, &score_b);
    println!(
        "Predicted winner: {} ({:.1}% vs {:.1}%)",
        outcome.winner,
        outcome.winner_score * 100.0,
        outcome.loser_score * 100.0
    );
    if outcome.is_tie() {
        println!("(exact tie; the second lineup is awarded the win)");
    }
    Ok(())
}

fn print_side(label: &str, lineup: &Lineup, score: &LineupScore) {
    println!("{label}");
    for p in &lineup.players {
        let position = p.position.map_or("-", |pos| pos.code());
        let height = p
            .combine
            .as_ref()
            .and_then(|c| c.height_cm)
            .map(|h| format!(", {h:.1} cm"))
            .unwrap_or_default();
        println!("  {:<24} {:<4} {:<2} {}{}", p.name, p.team, position, p.season, height);
    }
    let summary = LineupSummary::of(lineup);
    println!(
        "  PTS {:.1}  AST {:.1}  REB {:.1}  AST/USG {:.2}",
        summary.total_points, summary.total_assists, summary.total_rebounds, summary.team_ast_usg
    );
    println!(
        "  win rate {:.1}% (model {:.1}% x {:.2}, {})",
        score.win_rate * 100.0,
        score.raw_win_rate * 100.0,
        score.coherence.multiplier,
        score.description()
    );
    println!();
}

fn run_features(predictor: &LineupPredictor, json: bool) -> anyhow::Result<()> {
    let report = predictor.report();
    if json {
        #[derive(Serialize)]
        struct FeaturesReport<'a> {
            features: Vec<&'static str>,
            training: &'a hoopcast_core::trainer::TrainingReport,
        }
        let out = FeaturesReport {
            features: predictor.feature_set().names(),
            training: report,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Trained {} trees (max depth {}) on {} team seasons, in-sample MAE {:.4}",
        report.n_trees, report.max_tree_depth, report.rows, report.in_sample_mae
    );
    for (feature, importance) in predictor
        .feature_set()
        .iter()
        .zip(&report.feature_importances)
    {
        println!("  {:<20} {:>6.3}", feature, importance);
    }
    Ok(())
}

fn run_teams(predictor: &LineupPredictor, json: bool) -> anyhow::Result<()> {
    let teams = predictor.team_averages();
    if json {
        println!("{}", serde_json::to_string_pretty(&teams)?);
        return Ok(());
    }
    for team in &teams {
        let win_rate = team
            .win_rate
            .map_or_else(|| "-".to_string(), |w| format!("{:.3}", w));
        println!("{:<4} seasons {:>2}  win rate {}", team.team, team.seasons, win_rate);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("hoopcast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopcast_core=info,hoopcast=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
