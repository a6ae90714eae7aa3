// Team-season aggregation: turns player rows into training examples.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::dataset::PlayerSeasonRecord;
use crate::features::{column_mean, Column, Feature};
use crate::selection::FeatureSet;

/// Mean selected features of a team-season's top scorers, with the team's
/// actual win rate.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSeasonAggregate {
    pub season_year: i32,
    pub team: String,
    /// One value per feature, in FeatureSet order.
    pub features: Vec<f64>,
    pub win_rate: f64,
}

/// Group row indices by (season year, team). BTreeMap keeps groups ordered;
/// indices within a group keep table order.
fn group_by_team_season(records: &[PlayerSeasonRecord]) -> BTreeMap<(i32, &str), Vec<usize>> {
    let mut groups: BTreeMap<(i32, &str), Vec<usize>> = BTreeMap::new();
    for (idx, r) in records.iter().enumerate() {
        groups
            .entry((r.season_year, r.team.as_str()))
            .or_default()
            .push(idx);
    }
    groups
}

/// The `n` highest raw point totals in a group. Stable: equal points keep
/// table order and missing points sort last.
pub fn top_scorers<'a>(
    records: &'a [PlayerSeasonRecord],
    indices: &[usize],
    n: usize,
) -> Vec<&'a PlayerSeasonRecord> {
    let mut rows: Vec<&PlayerSeasonRecord> = indices.iter().map(|&i| &records[i]).collect();
    rows.sort_by(|a, b| match (a.pts, b.pts) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    rows.truncate(n);
    rows
}

/// One training row per (season, team). Groups without a win rate, or whose
/// top scorers have no value at all for some selected feature, are skipped.
pub fn team_season_aggregates(
    records: &[PlayerSeasonRecord],
    features: &FeatureSet,
    top_n: usize,
) -> Vec<TeamSeasonAggregate> {
    let mut out = Vec::new();
    for ((season_year, team), indices) in group_by_team_season(records) {
        // Label: the first win rate recorded for the team-season.
        let Some(win_rate) = indices.iter().find_map(|&i| records[i].win_rate) else {
            debug!("{} {}: no win rate, excluded from training", season_year, team);
            continue;
        };

        let top = top_scorers(records, &indices, top_n);
        let means: Option<Vec<f64>> = features
            .iter()
            .map(|f| {
                let values: Vec<f64> = top.iter().filter_map(|r| r.feature(f)).collect();
                (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
            })
            .collect();
        let Some(means) = means else {
            debug!("{} {}: selected feature has no values, excluded", season_year, team);
            continue;
        };

        out.push(TeamSeasonAggregate {
            season_year,
            team: team.to_string(),
            features: means,
            win_rate,
        });
    }
    out
}

/// Descriptive per-team averages across all seasons, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAverages {
    pub team: String,
    pub seasons: usize,
    pub win_rate: Option<f64>,
    pub stats: BTreeMap<Feature, Option<f64>>,
}

/// Mean win rate and feature values per team abbreviation.
pub fn team_averages(records: &[PlayerSeasonRecord]) -> Vec<TeamAverages> {
    let mut by_team: BTreeMap<&str, Vec<PlayerSeasonRecord>> = BTreeMap::new();
    for r in records {
        by_team.entry(r.team.as_str()).or_default().push(r.clone());
    }

    by_team
        .into_iter()
        .map(|(team, rows)| {
            let mut seasons: Vec<i32> = rows.iter().map(|r| r.season_year).collect();
            seasons.sort_unstable();
            seasons.dedup();
            TeamAverages {
                team: team.to_string(),
                seasons: seasons.len(),
                win_rate: column_mean(&rows, Column::WinRate),
                stats: Feature::CANDIDATES
                    .into_iter()
                    .map(|f| (f, column_mean(&rows, Column::Feature(f))))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, team: &str, season: &str, pts: Option<f64>, ppg: f64) -> PlayerSeasonRecord {
        let mut r = PlayerSeasonRecord::new(name, team, season);
        r.pts = pts;
        r.derived.pts_per_game = Some(ppg);
        r.ts_pct = Some(0.5);
        r.win_rate = Some(0.5);
        r
    }

    fn features() -> FeatureSet {
        FeatureSet::new(vec![Feature::PtsPerGame, Feature::TsPct])
    }

    #[test]
    fn averages_top_five_scorers_only() {
        let mut rows: Vec<_> = (0..7)
            .map(|i| player(&format!("P{i}"), "BOS", "2010-11", Some(100.0 * i as f64), i as f64))
            .collect();
        for r in &mut rows {
            r.win_rate = Some(0.7);
        }

        let aggs = team_season_aggregates(&rows, &features(), 5);
        assert_eq!(aggs.len(), 1);
        // Top five by points are P6..P2: mean ppg = (6+5+4+3+2)/5.
        assert!((aggs[0].features[0] - 4.0).abs() < 1e-12);
        assert!((aggs[0].features[1] - 0.5).abs() < 1e-12);
        assert!((aggs[0].win_rate - 0.7).abs() < 1e-12);
        assert_eq!(aggs[0].season_year, 2010);
        assert_eq!(aggs[0].team, "BOS");
    }

    #[test]
    fn ties_keep_table_order_and_missing_points_sort_last() {
        let rows = vec![
            player("NoPts", "BOS", "2010-11", None, 99.0),
            player("A", "BOS", "2010-11", Some(10.0), 1.0),
            player("B", "BOS", "2010-11", Some(10.0), 2.0),
            player("C", "BOS", "2010-11", Some(10.0), 3.0),
        ];
        let idx: Vec<usize> = (0..rows.len()).collect();
        let top: Vec<&str> = top_scorers(&rows, &idx, 2)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(top, vec!["A", "B"]);

        let all: Vec<&str> = top_scorers(&rows, &idx, 10)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(all, vec!["A", "B", "C", "NoPts"]);
    }

    #[test]
    fn one_row_per_team_season_in_key_order() {
        let rows = vec![
            player("A", "LAL", "2011-12", Some(1.0), 1.0),
            player("B", "BOS", "2011-12", Some(1.0), 1.0),
            player("C", "LAL", "2010-11", Some(1.0), 1.0),
            player("D", "LAL", "2011-12", Some(2.0), 3.0),
        ];
        let aggs = team_season_aggregates(&rows, &features(), 5);
        let keys: Vec<(i32, &str)> = aggs.iter().map(|a| (a.season_year, a.team.as_str())).collect();
        assert_eq!(keys, vec![(2010, "LAL"), (2011, "BOS"), (2011, "LAL")]);
        assert!((aggs[2].features[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn team_seasons_without_win_rate_are_excluded() {
        let mut rows = vec![
            player("A", "LAL", "2011-12", Some(1.0), 1.0),
            player("B", "BOS", "2011-12", Some(1.0), 1.0),
        ];
        rows[1].win_rate = None;
        let aggs = team_season_aggregates(&rows, &features(), 5);
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[0].team, "LAL");
    }

    #[test]
    fn team_averages_span_seasons() {
        let mut rows = vec![
            player("A", "LAL", "2010-11", Some(1.0), 10.0),
            player("B", "LAL", "2011-12", Some(1.0), 20.0),
            player("C", "BOS", "2011-12", Some(1.0), 5.0),
        ];
        rows[0].win_rate = Some(0.4);
        rows[1].win_rate = Some(0.6);
        let teams = team_averages(&rows);
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].team, "BOS");
        let lal = &teams[1];
        assert_eq!(lal.seasons, 2);
        assert!((lal.win_rate.unwrap() - 0.5).abs() < 1e-12);
        assert!((lal.stats[&Feature::PtsPerGame].unwrap() - 15.0).abs() < 1e-12);
        assert_eq!(lal.stats[&Feature::NetRating], None);
    }
}
