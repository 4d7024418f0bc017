//! Core domain model for the survivor pool: players, picks, games, and the
//! derived per-pick results the reconciliation engine maintains.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "pool-core";

/// Hours after kickoff at which a game with both scores on the board is
/// considered finished even if the feed never flipped its status to final.
pub const STALL_HOURS: i64 = 4;

/// Source tag stamped on picks ingested from the pick sheet.
pub const PICK_SOURCE_SHEET: &str = "sheet";
/// Source tag stamped on synthetic missed-deadline picks.
pub const PICK_SOURCE_AUTO_ELIMINATION: &str = "auto_elimination";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PickId(pub u64);

/// Natural game identifier as issued by the score feed.
pub type GameId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
}

/// One team selection for a (player, season, week). `team == None` is the
/// missed-deadline sentinel written by the auto-eliminator, never by a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub id: PickId,
    pub player_id: PlayerId,
    pub season: u32,
    pub week: u32,
    pub team: Option<String>,
    pub source: String,
    pub picked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Pre,
    In,
    Final,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Pre => "pre",
            GameStatus::In => "in",
            GameStatus::Final => "final",
        }
    }
}

/// A scheduled or played game, upserted repeatedly as the feed progresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub season: u32,
    pub week: u32,
    pub kickoff: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub status: GameStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub winner: Option<String>,
    pub point_spread: Option<f64>,
    pub favorite_team: Option<String>,
}

impl Game {
    /// Whether the picked team plays in this game.
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// A game counts as complete once the feed marks it final, or once both
    /// scores are on the board and kickoff was more than [`STALL_HOURS`] ago.
    /// The latter covers feeds that stall in `in` forever.
    pub fn is_complete(&self, now: DateTime<Utc>) -> bool {
        if self.status == GameStatus::Final {
            return true;
        }
        self.home_score.is_some()
            && self.away_score.is_some()
            && now - self.kickoff > Duration::hours(STALL_HOURS)
    }

    /// Winner by score comparison. Equal scores are a tie and yield `None`.
    pub fn derived_winner(&self) -> Option<String> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) if home > away => Some(self.home_team.clone()),
            (Some(home), Some(away)) if away > home => Some(self.away_team.clone()),
            _ => None,
        }
    }

    /// Key used to join odds feed entries onto games.
    pub fn matchup_key(&self) -> String {
        format!("{}_at_{}", self.away_team, self.home_team)
    }
}

/// Derived outcome of a pick. `survived` stays `None` until the linked game
/// is complete; `is_locked` only ever moves false -> true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickResult {
    pub pick_id: PickId,
    pub game_id: Option<GameId>,
    pub is_valid: bool,
    pub is_locked: bool,
    pub survived: Option<bool>,
}

impl PickResult {
    pub fn new(pick_id: PickId) -> Self {
        Self {
            pick_id,
            game_id: None,
            is_valid: true,
            is_locked: false,
            survived: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Success,
    Skipped,
    Warning,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Skipped => "skipped",
            JobStatus::Warning => "warning",
            JobStatus::Error => "error",
        }
    }
}

/// Per-job audit row, queryable by operators and dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRunRecord {
    pub job_name: String,
    pub last_run_at: DateTime<Utc>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub message: String,
}

/// Validated form of the pick sheet: player display name -> week -> team.
/// Sparse by construction; a missing week is a missing submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickSheet {
    pub players: BTreeMap<String, BTreeMap<u32, String>>,
}

impl PickSheet {
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn pick_count(&self) -> usize {
        self.players.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn game(status: GameStatus, home_score: Option<i32>, away_score: Option<i32>) -> Game {
        Game {
            id: "401671789".to_string(),
            season: 2025,
            week: 3,
            kickoff: Utc.with_ymd_and_hms(2025, 9, 21, 17, 0, 0).single().unwrap(),
            home_team: "KC".to_string(),
            away_team: "DEN".to_string(),
            status,
            home_score,
            away_score,
            winner: None,
            point_spread: None,
            favorite_team: None,
        }
    }

    #[test]
    fn final_status_is_complete_regardless_of_clock() {
        let g = game(GameStatus::Final, Some(24), Some(20));
        let before_kickoff = Utc.with_ymd_and_hms(2025, 9, 21, 12, 0, 0).single().unwrap();
        assert!(g.is_complete(before_kickoff));
    }

    #[test]
    fn stalled_in_game_completes_after_four_hours() {
        let g = game(GameStatus::In, Some(24), Some(20));
        let three_hours = Utc.with_ymd_and_hms(2025, 9, 21, 20, 0, 0).single().unwrap();
        let five_hours = Utc.with_ymd_and_hms(2025, 9, 21, 22, 0, 0).single().unwrap();
        assert!(!g.is_complete(three_hours));
        assert!(g.is_complete(five_hours));
    }

    #[test]
    fn missing_scores_never_complete_by_clock() {
        let g = game(GameStatus::In, Some(24), None);
        let much_later = Utc.with_ymd_and_hms(2025, 9, 22, 17, 0, 0).single().unwrap();
        assert!(!g.is_complete(much_later));
    }

    #[test]
    fn derived_winner_handles_ties() {
        assert_eq!(
            game(GameStatus::Final, Some(24), Some(20)).derived_winner(),
            Some("KC".to_string())
        );
        assert_eq!(
            game(GameStatus::Final, Some(13), Some(27)).derived_winner(),
            Some("DEN".to_string())
        );
        assert_eq!(game(GameStatus::Final, Some(17), Some(17)).derived_winner(), None);
        assert_eq!(game(GameStatus::Final, None, Some(17)).derived_winner(), None);
    }

    #[test]
    fn matchup_key_is_away_at_home() {
        assert_eq!(game(GameStatus::Pre, None, None).matchup_key(), "DEN_at_KC");
    }
}
