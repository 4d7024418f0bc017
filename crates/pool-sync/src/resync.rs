//! Destructive rebuild of players and picks from the commissioner's sheet.
//!
//! The sheet is the single source of truth for who entered the pool and what
//! they picked, so resync deletes the season's picks (results cascade) and
//! every player row, then reinserts from the parsed sheet. The caller decides
//! whether to run; an empty sheet must never reach this function.

use chrono::{DateTime, Utc};
use pool_core::{PickSheet, PICK_SOURCE_SHEET};
use pool_storage::StoreTxn;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncOutcome {
    pub players: usize,
    pub picks: usize,
}

pub fn resync_picks(
    txn: &mut StoreTxn,
    season: u32,
    sheet: &PickSheet,
    now: DateTime<Utc>,
) -> ResyncOutcome {
    let removed_picks = txn.delete_picks_for_season(season);
    let removed_players = txn.delete_all_players();

    let mut outcome = ResyncOutcome::default();
    for (name, weeks) in &sheet.players {
        let player = txn.get_or_create_player(name);
        outcome.players += 1;
        for (&week, team) in weeks {
            txn.upsert_pick(player, season, week, Some(team), PICK_SOURCE_SHEET, now);
            outcome.picks += 1;
        }
    }

    info!(
        season,
        removed_picks,
        removed_players,
        players = outcome.players,
        picks = outcome.picks,
        "rebuilt players and picks from sheet"
    );
    outcome
}
