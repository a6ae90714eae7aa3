// Head-to-head resolution between two scored lineups.

use serde::Serialize;
use std::fmt;

use crate::scoring::{Lineup, LineupScore};

/// Which of the two lineups passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("Team A"),
            Side::B => f.write_str("Team B"),
        }
    }
}

/// Result of a matchup. Borrows the winning lineup from the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupOutcome<'a> {
    pub winner: Side,
    pub winner_lineup: &'a Lineup,
    pub winner_score: f64,
    pub loser_score: f64,
    pub winner_desc: String,
    pub loser_desc: String,
}

impl MatchupOutcome<'_> {
    pub fn margin(&self) -> f64 {
        self.winner_score - self.loser_score
    }

    pub fn is_tie(&self) -> bool {
        self.winner_score == self.loser_score
    }
}

/// Pick the winner of two already-scored lineups.
///
/// Lineup A wins only with a strictly greater score; an exact tie goes to B.
pub fn resolve<'a>(
    a: (&'a Lineup, &LineupScore),
    b: (&'a Lineup, &LineupScore),
) -> MatchupOutcome<'a> {
    let ((lineup_a, score_a), (lineup_b, score_b)) = (a, b);
    let (winner, winner_lineup, won, lost) = if score_a.win_rate > score_b.win_rate {
        (Side::A, lineup_a, score_a, score_b)
    } else {
        (Side::B, lineup_b, score_b, score_a)
    };
    MatchupOutcome {
        winner,
        winner_lineup,
        winner_score: won.win_rate,
        loser_score: lost.win_rate,
        winner_desc: won.description().to_string(),
        loser_desc: lost.description().to_string(),
    }
}
