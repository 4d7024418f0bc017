//! The elimination reconciliation engine.
//!
//! One full pass links every pick to its game, locks picks whose games have
//! kicked off, resolves survival for complete games, repairs games the feed
//! left stalled, and synthesizes eliminations for missed submissions. The
//! pass is a pure function of current game and pick state: re-running it on
//! unchanged data makes zero writes, which is what lets two independently
//! scheduled jobs both call it safely.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use pool_core::{GameStatus, PICK_SOURCE_AUTO_ELIMINATION, STALL_HOURS};
use pool_storage::StoreTxn;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassOutcome {
    pub picks_updated: usize,
    pub stuck_games_fixed: usize,
    pub auto_eliminations: usize,
}

/// Run the whole reconciliation pass for a season. `current_week` bounds the
/// missing-pick sweep: only weeks strictly before it are eligible.
pub fn run_full_pass(
    txn: &mut StoreTxn,
    season: u32,
    current_week: u32,
    now: DateTime<Utc>,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    // Ascending week order: elimination effects cascade forward in time.
    for week in txn.weeks_with_picks(season) {
        outcome.picks_updated += reconcile_week(txn, season, week, now);
    }
    outcome.stuck_games_fixed = finalize_stuck_games(txn, now);
    outcome.auto_eliminations = eliminate_missing_picks(txn, season, current_week, now);

    debug!(
        season,
        current_week,
        picks_updated = outcome.picks_updated,
        stuck_games_fixed = outcome.stuck_games_fixed,
        auto_eliminations = outcome.auto_eliminations,
        "reconciliation pass complete"
    );
    outcome
}

fn reconcile_week(txn: &mut StoreTxn, season: u32, week: u32, now: DateTime<Utc>) -> usize {
    let mut updated = 0;

    for pick in txn.picks_for_week(season, week) {
        let Some(team) = pick.team.clone() else {
            // Missed-deadline sentinels carry their result from creation.
            continue;
        };
        let Some(game) = txn.find_game_for_team(season, week, &team).cloned() else {
            // Feed has not published this game yet; retried next pass.
            debug!(season, week, pick_id = ?pick.id, team, "no matching game for pick; skipping");
            continue;
        };

        if txn.ensure_result(pick.id) {
            updated += 1;
        }
        if txn.link_result_game(pick.id, &game.id) {
            updated += 1;
        }

        // One-directional: kicked-off picks lock and never unlock.
        if now >= game.kickoff && txn.lock_result(pick.id) {
            updated += 1;
        }

        if !game.is_complete(now) {
            continue;
        }

        if txn.force_game_final(&game.id) {
            updated += 1;
        }
        let winner = game.winner.clone().or_else(|| game.derived_winner());
        match winner {
            Some(winner) => {
                if txn.set_game_winner_if_unset(&game.id, &winner) {
                    updated += 1;
                }
                if txn.set_result_survival(pick.id, team == winner) {
                    updated += 1;
                }
            }
            None if game.home_score.is_some() && game.away_score.is_some() => {
                // Tie. Pool rule: ties eliminate, they never preserve survival.
                if txn.set_result_survival(pick.id, false) {
                    updated += 1;
                }
            }
            None => {
                // Final with no scores and no winner: nothing to derive from.
            }
        }
    }

    updated
}

/// Repair pass for feeds that never flip a finished game to `final`: any
/// non-final game with both scores on the board and kickoff more than
/// [`STALL_HOURS`] ago gets forced final, and survival is re-propagated to
/// the picks riding on it.
fn finalize_stuck_games(txn: &mut StoreTxn, now: DateTime<Utc>) -> usize {
    let mut fixed = 0;

    for game in txn.non_final_games() {
        let stalled = game.home_score.is_some()
            && game.away_score.is_some()
            && now - game.kickoff > Duration::hours(STALL_HOURS);
        if !stalled {
            continue;
        }

        txn.force_game_final(&game.id);
        let winner = game.derived_winner();
        if let Some(winner) = &winner {
            txn.set_game_winner_if_unset(&game.id, winner);
        }
        info!(
            game_id = %game.id,
            season = game.season,
            week = game.week,
            winner = winner.as_deref().unwrap_or("<tie>"),
            "finalized stuck game"
        );
        fixed += 1;

        for pick in txn.picks_for_week(game.season, game.week) {
            let Some(team) = pick.team.clone() else {
                continue;
            };
            if !game.involves(&team) {
                continue;
            }
            txn.ensure_result(pick.id);
            txn.link_result_game(pick.id, &game.id);
            txn.lock_result(pick.id);
            match &winner {
                Some(winner) => {
                    txn.set_result_survival(pick.id, team == *winner);
                }
                None => {
                    txn.set_result_survival(pick.id, false);
                }
            }
        }
    }

    fixed
}

/// Auto-eliminate players who were genuinely in the pool but submitted
/// nothing for a completed week. Synthesizes the null-team sentinel pick
/// plus an invalid, locked, eliminated result, exactly once per slot.
fn eliminate_missing_picks(
    txn: &mut StoreTxn,
    season: u32,
    current_week: u32,
    now: DateTime<Utc>,
) -> usize {
    let mut eliminated = 0;

    let mut alive: BTreeSet<_> = txn.player_ids_with_any_pick(season);
    for player_id in txn.eliminated_player_ids(season) {
        alive.remove(&player_id);
    }

    for week in 1..current_week {
        let games = txn.games_for_week(season, week);
        if games.is_empty() || games.iter().any(|g| g.status != GameStatus::Final) {
            continue;
        }

        let with_picks = txn.player_ids_with_team_pick(season, week);
        let missing: Vec<_> = alive
            .iter()
            .copied()
            .filter(|player_id| !with_picks.contains(player_id))
            .collect();

        for player_id in missing {
            if txn.null_team_pick_exists(player_id, season, week) {
                continue;
            }
            // Pure no-shows (no pick history before this week) are rows on
            // the sheet that never played; they are not eliminated.
            if !txn.has_pick_before(player_id, season, week) {
                continue;
            }

            let display_name = txn
                .player(player_id)
                .map(|p| p.display_name.clone())
                .unwrap_or_default();
            let pick_id = txn.upsert_pick(
                player_id,
                season,
                week,
                None,
                PICK_SOURCE_AUTO_ELIMINATION,
                now,
            );
            txn.ensure_result(pick_id);
            txn.mark_result_invalid(pick_id);
            txn.lock_result(pick_id);
            txn.set_result_survival(pick_id, false);

            info!(season, week, player = %display_name, "auto-eliminated for missing pick");
            // Out of the pool before the next week is evaluated, so one
            // missed week never compounds into several synthetic rows.
            alive.remove(&player_id);
            eliminated += 1;
        }
    }

    eliminated
}
