//! Odds feed: point spreads keyed by matchup.
//!
//! The odds API identifies games by full team names, not by the score feed's
//! game ids, so lines are keyed `"{away}_at_{home}"` on normalized
//! abbreviations and joined onto games downstream. A missing API key is an
//! expected configuration, not an error: the feed yields an empty map.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::{FeedClient, FeedError};

/// Bookmakers tried in order before falling back to whatever is quoted.
const PREFERRED_BOOKS: [&str; 4] = ["draftkings", "fanduel", "betmgm", "caesars"];

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadLine {
    /// Absolute spread in points; the sign lives in `favorite_team`.
    pub point_spread: f64,
    pub favorite_team: String,
    pub book: String,
}

#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// Point spreads for the week, keyed `"{away}_at_{home}"`.
    async fn point_spreads(
        &self,
        season: u32,
        week: u32,
    ) -> Result<HashMap<String, SpreadLine>, FeedError>;
}

pub struct OddsApiFeed {
    client: Arc<FeedClient>,
    base_url: String,
    api_key: Option<String>,
}

impl OddsApiFeed {
    pub fn new(
        client: Arc<FeedClient>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl OddsFeed for OddsApiFeed {
    async fn point_spreads(
        &self,
        _season: u32,
        _week: u32,
    ) -> Result<HashMap<String, SpreadLine>, FeedError> {
        let Some(api_key) = &self.api_key else {
            warn!("no odds API key configured; skipping odds fetch");
            return Ok(HashMap::new());
        };

        let url = format!(
            "{}/sports/americanfootball_nfl/odds?apiKey={api_key}&regions=us&markets=spreads&oddsFormat=american",
            self.base_url
        );
        let events: Vec<OddsEvent> = self.client.get_json(&url).await?;
        Ok(parse_odds_events(&events))
    }
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize)]
struct Bookmaker {
    #[serde(default)]
    key: String,
    title: Option<String>,
    #[serde(default)]
    markets: Vec<Market>,
}

#[derive(Debug, Deserialize)]
struct Market {
    #[serde(default)]
    key: String,
    #[serde(default)]
    outcomes: Vec<Outcome>,
}

#[derive(Debug, Deserialize)]
struct Outcome {
    #[serde(default)]
    name: String,
    point: Option<f64>,
}

fn parse_odds_events(events: &[OddsEvent]) -> HashMap<String, SpreadLine> {
    let mut spreads = HashMap::new();
    for event in events {
        let home = team_abbreviation(&event.home_team);
        let away = team_abbreviation(&event.away_team);
        let key = format!("{away}_at_{home}");
        if let Some(line) = extract_spread(event) {
            spreads.insert(key, line);
        }
    }
    spreads
}

fn extract_spread(event: &OddsEvent) -> Option<SpreadLine> {
    for preferred in PREFERRED_BOOKS {
        for bookmaker in &event.bookmakers {
            if bookmaker.key.to_lowercase().contains(preferred) {
                if let Some(line) = bookmaker_spread(bookmaker, event) {
                    return Some(line);
                }
            }
        }
    }
    event
        .bookmakers
        .iter()
        .find_map(|bookmaker| bookmaker_spread(bookmaker, event))
}

fn bookmaker_spread(bookmaker: &Bookmaker, event: &OddsEvent) -> Option<SpreadLine> {
    let market = bookmaker.markets.iter().find(|m| m.key == "spreads")?;
    if market.outcomes.len() != 2 {
        return None;
    }
    let home_point = market
        .outcomes
        .iter()
        .find(|o| o.name == event.home_team)?
        .point?;

    // Negative home point means the home side is favored.
    let favorite = if home_point > 0.0 {
        team_abbreviation(&event.away_team)
    } else {
        team_abbreviation(&event.home_team)
    };
    Some(SpreadLine {
        point_spread: home_point.abs(),
        favorite_team: favorite,
        book: bookmaker
            .title
            .clone()
            .unwrap_or_else(|| bookmaker.key.clone()),
    })
}

/// Map full franchise names onto the pool's abbreviations; anything already
/// short passes through uppercased.
fn team_abbreviation(name: &str) -> String {
    match name {
        "Arizona Cardinals" => "ARI",
        "Atlanta Falcons" => "ATL",
        "Baltimore Ravens" => "BAL",
        "Buffalo Bills" => "BUF",
        "Carolina Panthers" => "CAR",
        "Chicago Bears" => "CHI",
        "Cincinnati Bengals" => "CIN",
        "Cleveland Browns" => "CLE",
        "Dallas Cowboys" => "DAL",
        "Denver Broncos" => "DEN",
        "Detroit Lions" => "DET",
        "Green Bay Packers" => "GB",
        "Houston Texans" => "HOU",
        "Indianapolis Colts" => "IND",
        "Jacksonville Jaguars" => "JAX",
        "Kansas City Chiefs" => "KC",
        "Las Vegas Raiders" => "LV",
        "Los Angeles Chargers" => "LAC",
        "Los Angeles Rams" => "LAR",
        "Miami Dolphins" => "MIA",
        "Minnesota Vikings" => "MIN",
        "New England Patriots" => "NE",
        "New Orleans Saints" => "NO",
        "New York Giants" => "NYG",
        "New York Jets" => "NYJ",
        "Philadelphia Eagles" => "PHI",
        "Pittsburgh Steelers" => "PIT",
        "San Francisco 49ers" => "SF",
        "Seattle Seahawks" => "SEA",
        "Tampa Bay Buccaneers" => "TB",
        "Tennessee Titans" => "TEN",
        "Washington Commanders" => "WAS",
        other => return other.to_uppercase(),
    }
    .to_string()
}
