//! Score feed: weekly schedule, live scores, and the current-week pointer.
//!
//! [`ScoreboardFeed`] speaks the public scoreboard JSON shape (events ->
//! competitions -> competitors). Parsing is tolerant: an event that cannot be
//! parsed is skipped with a warning rather than failing the whole fetch.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use pool_core::{Game, GameStatus};
use serde::Deserialize;
use tracing::warn;

use crate::{FeedClient, FeedError};

#[async_trait]
pub trait ScoreFeed: Send + Sync {
    async fn current_week(&self, season: u32) -> Result<u32, FeedError>;
    async fn schedule_and_scores(&self, season: u32, week: u32) -> Result<Vec<Game>, FeedError>;
}

pub struct ScoreboardFeed {
    client: Arc<FeedClient>,
    base_url: String,
}

impl ScoreboardFeed {
    pub fn new(client: Arc<FeedClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ScoreFeed for ScoreboardFeed {
    async fn current_week(&self, _season: u32) -> Result<u32, FeedError> {
        let url = format!("{}/scoreboard", self.base_url);
        let doc: Scoreboard = self.client.get_json(&url).await?;
        doc.week
            .map(|w| w.number)
            .ok_or_else(|| FeedError::Malformed {
                url,
                reason: "scoreboard response has no week pointer".to_string(),
            })
    }

    async fn schedule_and_scores(&self, season: u32, week: u32) -> Result<Vec<Game>, FeedError> {
        let url = format!(
            "{}/scoreboard?dates={season}&seasontype=2&week={week}",
            self.base_url
        );
        let doc: Scoreboard = self.client.get_json(&url).await?;
        Ok(parse_scoreboard(&doc, season, week))
    }
}

#[derive(Debug, Deserialize)]
struct Scoreboard {
    #[serde(default)]
    events: Vec<Event>,
    week: Option<WeekPointer>,
}

#[derive(Debug, Deserialize)]
struct WeekPointer {
    number: u32,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    date: String,
    #[serde(default)]
    competitions: Vec<Competition>,
}

#[derive(Debug, Deserialize)]
struct Competition {
    #[serde(default)]
    competitors: Vec<Competitor>,
    status: Option<CompetitionStatus>,
}

#[derive(Debug, Deserialize)]
struct CompetitionStatus {
    #[serde(rename = "type")]
    kind: Option<StatusType>,
}

#[derive(Debug, Deserialize)]
struct StatusType {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Competitor {
    #[serde(rename = "homeAway", default)]
    home_away: String,
    team: TeamRef,
    score: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    abbreviation: String,
}

fn parse_scoreboard(doc: &Scoreboard, season: u32, week: u32) -> Vec<Game> {
    doc.events
        .iter()
        .filter_map(|event| match parse_event(event, season, week) {
            Some(game) => Some(game),
            None => {
                warn!(event_id = %event.id, season, week, "skipping unparseable scoreboard event");
                None
            }
        })
        .collect()
}

fn parse_event(event: &Event, season: u32, week: u32) -> Option<Game> {
    let kickoff = parse_kickoff(&event.date)?;
    let competition = event.competitions.first()?;
    if competition.competitors.len() != 2 {
        return None;
    }

    let home = competition
        .competitors
        .iter()
        .find(|c| c.home_away == "home")
        .or_else(|| competition.competitors.first())?;
    let away = competition
        .competitors
        .iter()
        .find(|c| c.home_away == "away")
        .or_else(|| competition.competitors.get(1))?;

    let home_team = normalize_team(&home.team.abbreviation);
    let away_team = normalize_team(&away.team.abbreviation);

    let status_name = competition
        .status
        .as_ref()
        .and_then(|s| s.kind.as_ref())
        .map(|k| k.name.to_ascii_lowercase())
        .unwrap_or_default();
    let status = if status_name.contains("final") {
        GameStatus::Final
    } else if status_name.contains("in") || status_name.contains("progress") {
        GameStatus::In
    } else {
        GameStatus::Pre
    };

    let (home_score, away_score) = if status == GameStatus::Pre {
        (None, None)
    } else {
        (parse_score(home.score.as_deref()), parse_score(away.score.as_deref()))
    };

    // The feed only commits to a winner once final; ties stay unset.
    let winner = match (status, home_score, away_score) {
        (GameStatus::Final, Some(h), Some(a)) if h > a => Some(home_team.clone()),
        (GameStatus::Final, Some(h), Some(a)) if a > h => Some(away_team.clone()),
        _ => None,
    };

    Some(Game {
        id: event.id.clone(),
        season,
        week,
        kickoff,
        home_team,
        away_team,
        status,
        home_score,
        away_score,
        winner,
        point_spread: None,
        favorite_team: None,
    })
}

fn parse_score(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|s| s.parse().ok()).or(Some(0))
}

/// The scoreboard timestamps come with and without seconds ("…T17:00Z").
fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Fold feed-specific abbreviations onto the pool's canonical set.
pub(crate) fn normalize_team(abbr: &str) -> String {
    match abbr {
        "WSH" => "WAS".to_string(),
        other => other.to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scoreboard(status: &str, home_score: &str, away_score: &str) -> Scoreboard {
        serde_json::from_value(json!({
            "week": {"number": 3},
            "events": [{
                "id": "401671789",
                "date": "2025-09-21T17:00Z",
                "competitions": [{
                    "status": {"type": {"name": status}},
                    "competitors": [
                        {"homeAway": "home", "team": {"abbreviation": "KC"}, "score": home_score},
                        {"homeAway": "away", "team": {"abbreviation": "DEN"}, "score": away_score}
                    ]
                }]
            }]
        }))
        .expect("fixture deserializes")
    }

    #[test]
    fn parses_final_game_with_winner() {
        let games = parse_scoreboard(&scoreboard("STATUS_FINAL", "24", "20"), 2025, 3);
        assert_eq!(games.len(), 1);
        let game = &games[0];
        assert_eq!(game.id, "401671789");
        assert_eq!(game.status, GameStatus::Final);
        assert_eq!(game.home_team, "KC");
        assert_eq!(game.away_team, "DEN");
        assert_eq!(game.home_score, Some(24));
        assert_eq!(game.away_score, Some(20));
        assert_eq!(game.winner.as_deref(), Some("KC"));
        assert_eq!(
            game.kickoff,
            chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 9, 21, 17, 0, 0)
                .single()
                .unwrap()
        );
    }

    #[test]
    fn tie_leaves_winner_unset() {
        let games = parse_scoreboard(&scoreboard("STATUS_FINAL", "17", "17"), 2025, 3);
        assert_eq!(games[0].winner, None);
    }

    #[test]
    fn pregame_has_no_scores() {
        let games = parse_scoreboard(&scoreboard("STATUS_SCHEDULED", "0", "0"), 2025, 3);
        assert_eq!(games[0].status, GameStatus::Pre);
        assert_eq!(games[0].home_score, None);
        assert_eq!(games[0].away_score, None);
        assert_eq!(games[0].winner, None);
    }

    #[test]
    fn in_progress_has_scores_but_no_winner() {
        let games = parse_scoreboard(&scoreboard("STATUS_IN_PROGRESS", "14", "10"), 2025, 3);
        assert_eq!(games[0].status, GameStatus::In);
        assert_eq!(games[0].home_score, Some(14));
        assert_eq!(games[0].winner, None);
    }

    #[test]
    fn washington_abbreviation_is_normalized() {
        assert_eq!(normalize_team("WSH"), "WAS");
        assert_eq!(normalize_team("kc"), "KC");
    }

    #[test]
    fn event_without_two_competitors_is_skipped() {
        let doc: Scoreboard = serde_json::from_value(json!({
            "events": [{
                "id": "broken",
                "date": "2025-09-21T17:00Z",
                "competitions": [{"competitors": []}]
            }]
        }))
        .expect("fixture deserializes");
        assert!(parse_scoreboard(&doc, 2025, 3).is_empty());
    }
}
