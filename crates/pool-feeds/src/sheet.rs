//! Pick-sheet feed and parsing.
//!
//! The sheet is schema-less: row 0 is a header carrying zero or more
//! `"Week <N>"` columns, every later row is a player name followed by
//! team cells. Week columns are discovered dynamically so the commissioner
//! can add weeks without code changes. Parsing happens here, at the
//! ingestion boundary; nothing downstream sees raw rows.

use std::sync::Arc;

use async_trait::async_trait;
use pool_core::PickSheet;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{FeedClient, FeedError};

#[async_trait]
pub trait SheetFeed: Send + Sync {
    /// Raw sheet rows; row 0 is the header.
    async fn pick_rows(&self) -> Result<Vec<Vec<String>>, FeedError>;
}

/// Sheet feed over a values-API endpoint returning `{"values": [[...]]}`.
pub struct SheetValuesFeed {
    client: Arc<FeedClient>,
    url: String,
}

impl SheetValuesFeed {
    pub fn new(client: Arc<FeedClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValuesDocument {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[async_trait]
impl SheetFeed for SheetValuesFeed {
    async fn pick_rows(&self) -> Result<Vec<Vec<String>>, FeedError> {
        let doc: ValuesDocument = self.client.get_json(&self.url).await?;
        Ok(doc.values)
    }
}

/// Parse raw sheet rows into the sparse player -> week -> team map.
/// Malformed rows are skipped with a warning; they never fail the resync.
pub fn parse_pick_sheet(rows: &[Vec<String>]) -> PickSheet {
    let mut sheet = PickSheet::default();
    if rows.len() < 2 {
        warn!(rows = rows.len(), "pick sheet has no data rows");
        return sheet;
    }

    let header = &rows[0];
    let week_columns: Vec<(usize, u32)> = header
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            name.strip_prefix("Week ")
                .and_then(|n| n.trim().parse::<u32>().ok())
                .map(|week| (index, week))
        })
        .collect();
    debug!(weeks = week_columns.len(), "discovered week columns");

    for row in &rows[1..] {
        let Some(name) = row.first().map(|n| n.trim()).filter(|n| !n.is_empty()) else {
            continue;
        };
        let picks = sheet.players.entry(name.to_string()).or_default();
        for &(column, week) in &week_columns {
            let Some(cell) = row.get(column) else {
                continue;
            };
            let team = cell.trim().to_uppercase();
            if !team.is_empty() {
                picks.insert(week, team);
            }
        }
    }

    // A name row with no parseable picks still registers the player; that is
    // deliberate, the auto-eliminator needs to know who entered the pool.
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn discovers_week_columns_dynamically() {
        let sheet = parse_pick_sheet(&rows(&[
            &["Player", "Paid?", "Week 1", "Week 2", "Week 10"],
            &["Alice", "yes", "kc", "buf", "sf"],
            &["Bob", "no", "DEN", "", "dal"],
        ]));

        assert_eq!(sheet.player_count(), 2);
        let alice = &sheet.players["Alice"];
        assert_eq!(alice.get(&1).map(String::as_str), Some("KC"));
        assert_eq!(alice.get(&2).map(String::as_str), Some("BUF"));
        assert_eq!(alice.get(&10).map(String::as_str), Some("SF"));
        let bob = &sheet.players["Bob"];
        assert_eq!(bob.get(&1).map(String::as_str), Some("DEN"));
        assert!(!bob.contains_key(&2));
    }

    #[test]
    fn skips_blank_names_and_short_rows() {
        let sheet = parse_pick_sheet(&rows(&[
            &["Player", "Week 1", "Week 2"],
            &["  ", "KC", "BUF"],
            &["Carol"],
        ]));
        assert_eq!(sheet.player_count(), 1);
        assert!(sheet.players["Carol"].is_empty());
    }

    #[test]
    fn ignores_non_week_headers() {
        let sheet = parse_pick_sheet(&rows(&[
            &["Player", "Weekly notes", "Week x", "Week 3"],
            &["Dave", "nope", "nope", "gb"],
        ]));
        assert_eq!(sheet.players["Dave"].len(), 1);
        assert_eq!(sheet.players["Dave"].get(&3).map(String::as_str), Some("GB"));
    }

    #[test]
    fn empty_input_yields_empty_sheet() {
        assert!(parse_pick_sheet(&[]).is_empty());
        assert!(parse_pick_sheet(&rows(&[&["Player", "Week 1"]])).is_empty());
    }
}
