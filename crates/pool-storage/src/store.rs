//! Snapshot-transactional pool store.
//!
//! Each job run begins one [`StoreTxn`], mutates a private copy of the state,
//! and commits it in a single swap. Dropping a transaction without committing
//! discards every write, so a failed run leaves no partially-applied state
//! behind. Mutating methods report whether they changed anything and the
//! transaction keeps a running write count; a reconciliation pass over
//! unchanged data must finish with `writes() == 0`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use pool_core::{
    Game, GameId, GameStatus, JobRunRecord, JobStatus, Pick, PickId, PickResult, Player, PlayerId,
};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct PoolState {
    next_player_id: u64,
    next_pick_id: u64,
    players: BTreeMap<PlayerId, Player>,
    picks: BTreeMap<PickId, Pick>,
    games: BTreeMap<GameId, Game>,
    results: BTreeMap<PickId, PickResult>,
    job_runs: BTreeMap<String, JobRunRecord>,
}

#[derive(Clone, Default)]
pub struct PoolStore {
    inner: Arc<Mutex<PoolState>>,
}

impl PoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        // Poisoning only happens if a holder panicked mid-read; the state
        // itself is always a consistent committed snapshot.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Begin a transaction on a copy of the committed state.
    pub fn begin(&self) -> StoreTxn {
        StoreTxn {
            store: self.clone(),
            state: self.state().clone(),
            writes: 0,
        }
    }

    pub fn game(&self, id: &str) -> Option<Game> {
        self.state().games.get(id).cloned()
    }

    pub fn result(&self, pick_id: PickId) -> Option<PickResult> {
        self.state().results.get(&pick_id).cloned()
    }

    pub fn max_week_with_games(&self, season: u32) -> Option<u32> {
        self.state()
            .games
            .values()
            .filter(|g| g.season == season)
            .map(|g| g.week)
            .max()
    }

    /// Update a job audit row in its own short transaction, so the row
    /// survives even when the run's main transaction rolls back.
    pub fn record_job_run(&self, job_name: &str, status: JobStatus, message: &str, now: DateTime<Utc>) {
        let mut state = self.state();
        let record = state
            .job_runs
            .entry(job_name.to_string())
            .or_insert_with(|| JobRunRecord {
                job_name: job_name.to_string(),
                last_run_at: now,
                last_success_at: None,
                status,
                message: String::new(),
            });
        record.last_run_at = now;
        record.status = status;
        record.message = message.to_string();
        if status == JobStatus::Success {
            record.last_success_at = Some(now);
        }
    }

    pub fn job_run(&self, job_name: &str) -> Option<JobRunRecord> {
        self.state().job_runs.get(job_name).cloned()
    }
}

pub struct StoreTxn {
    store: PoolStore,
    state: PoolState,
    writes: usize,
}

impl StoreTxn {
    /// Number of state changes made so far in this transaction.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Atomically replace the committed state with this transaction's copy.
    pub fn commit(self) {
        let mut committed = self.store.state();
        *committed = self.state;
        debug!(writes = self.writes, "transaction committed");
    }

    fn wrote(&mut self, changed: bool) -> bool {
        if changed {
            self.writes += 1;
        }
        changed
    }

    // ---- games ----

    /// Insert or update a game by its natural id. Identity fields (season,
    /// week, kickoff, teams) are immutable after creation; status, scores
    /// and winner follow the feed; spread and favorite are only overwritten
    /// by non-null incoming values so a quiet odds feed never erases a
    /// previously known line.
    pub fn upsert_game(&mut self, incoming: Game) -> bool {
        let Some(existing) = self.state.games.get_mut(&incoming.id) else {
            self.state.games.insert(incoming.id.clone(), incoming);
            self.writes += 1;
            return true;
        };

        let mut changed = false;
        if existing.status != incoming.status {
            existing.status = incoming.status;
            changed = true;
        }
        if existing.home_score != incoming.home_score {
            existing.home_score = incoming.home_score;
            changed = true;
        }
        if existing.away_score != incoming.away_score {
            existing.away_score = incoming.away_score;
            changed = true;
        }
        if existing.winner != incoming.winner {
            existing.winner = incoming.winner;
            changed = true;
        }
        if incoming.point_spread.is_some() && existing.point_spread != incoming.point_spread {
            existing.point_spread = incoming.point_spread;
            changed = true;
        }
        if incoming.favorite_team.is_some() && existing.favorite_team != incoming.favorite_team {
            existing.favorite_team = incoming.favorite_team;
            changed = true;
        }
        self.wrote(changed)
    }

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.state.games.get(id)
    }

    pub fn find_game_for_team(&self, season: u32, week: u32, team: &str) -> Option<&Game> {
        self.state
            .games
            .values()
            .find(|g| g.season == season && g.week == week && g.involves(team))
    }

    pub fn games_for_week(&self, season: u32, week: u32) -> Vec<Game> {
        self.state
            .games
            .values()
            .filter(|g| g.season == season && g.week == week)
            .cloned()
            .collect()
    }

    pub fn non_final_games(&self) -> Vec<Game> {
        self.state
            .games
            .values()
            .filter(|g| g.status != GameStatus::Final)
            .cloned()
            .collect()
    }

    pub fn max_week_with_games(&self, season: u32) -> Option<u32> {
        self.state
            .games
            .values()
            .filter(|g| g.season == season)
            .map(|g| g.week)
            .max()
    }

    /// Force a game's status to final. One-way; already-final games are a no-op.
    pub fn force_game_final(&mut self, id: &str) -> bool {
        let changed = match self.state.games.get_mut(id) {
            Some(game) if game.status != GameStatus::Final => {
                game.status = GameStatus::Final;
                true
            }
            _ => false,
        };
        self.wrote(changed)
    }

    /// Record a winner unless one is already set. Ties never call this.
    pub fn set_game_winner_if_unset(&mut self, id: &str, winner: &str) -> bool {
        let changed = match self.state.games.get_mut(id) {
            Some(game) if game.winner.is_none() => {
                game.winner = Some(winner.to_string());
                true
            }
            _ => false,
        };
        self.wrote(changed)
    }

    // ---- players ----

    pub fn get_or_create_player(&mut self, display_name: &str) -> PlayerId {
        if let Some(player) = self
            .state
            .players
            .values()
            .find(|p| p.display_name == display_name)
        {
            return player.id;
        }
        self.state.next_player_id += 1;
        let id = PlayerId(self.state.next_player_id);
        self.state.players.insert(
            id,
            Player {
                id,
                display_name: display_name.to_string(),
            },
        );
        self.writes += 1;
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.state.players.get(&id)
    }

    pub fn rename_player(&mut self, id: PlayerId, display_name: &str) -> bool {
        let changed = match self.state.players.get_mut(&id) {
            Some(player) if player.display_name != display_name => {
                player.display_name = display_name.to_string();
                true
            }
            _ => false,
        };
        self.wrote(changed)
    }

    pub fn delete_all_players(&mut self) -> usize {
        let removed = self.state.players.len();
        self.state.players.clear();
        self.writes += removed;
        removed
    }

    // ---- picks ----

    /// One natural row per (player, season, week): update the team in place
    /// when the row exists, otherwise create it.
    pub fn upsert_pick(
        &mut self,
        player_id: PlayerId,
        season: u32,
        week: u32,
        team: Option<&str>,
        source: &str,
        now: DateTime<Utc>,
    ) -> PickId {
        if let Some(pick) = self
            .state
            .picks
            .values_mut()
            .find(|p| p.player_id == player_id && p.season == season && p.week == week)
        {
            let id = pick.id;
            if pick.team.as_deref() != team {
                pick.team = team.map(str::to_string);
                self.writes += 1;
            }
            return id;
        }
        self.state.next_pick_id += 1;
        let id = PickId(self.state.next_pick_id);
        self.state.picks.insert(
            id,
            Pick {
                id,
                player_id,
                season,
                week,
                team: team.map(str::to_string),
                source: source.to_string(),
                picked_at: now,
            },
        );
        self.writes += 1;
        id
    }

    pub fn pick(&self, id: PickId) -> Option<&Pick> {
        self.state.picks.get(&id)
    }

    pub fn picks_for_week(&self, season: u32, week: u32) -> Vec<Pick> {
        self.state
            .picks
            .values()
            .filter(|p| p.season == season && p.week == week)
            .cloned()
            .collect()
    }

    pub fn weeks_with_picks(&self, season: u32) -> BTreeSet<u32> {
        self.state
            .picks
            .values()
            .filter(|p| p.season == season)
            .map(|p| p.week)
            .collect()
    }

    pub fn player_ids_with_any_pick(&self, season: u32) -> BTreeSet<PlayerId> {
        self.state
            .picks
            .values()
            .filter(|p| p.season == season)
            .map(|p| p.player_id)
            .collect()
    }

    /// Players who submitted an actual team (not a sentinel) for the week.
    pub fn player_ids_with_team_pick(&self, season: u32, week: u32) -> BTreeSet<PlayerId> {
        self.state
            .picks
            .values()
            .filter(|p| p.season == season && p.week == week && p.team.is_some())
            .map(|p| p.player_id)
            .collect()
    }

    pub fn has_pick_before(&self, player_id: PlayerId, season: u32, week: u32) -> bool {
        self.state
            .picks
            .values()
            .any(|p| p.player_id == player_id && p.season == season && p.week < week)
    }

    /// Whether a missed-deadline sentinel already exists for this slot.
    pub fn null_team_pick_exists(&self, player_id: PlayerId, season: u32, week: u32) -> bool {
        self.state.picks.values().any(|p| {
            p.player_id == player_id && p.season == season && p.week == week && p.team.is_none()
        })
    }

    /// Delete a season's picks, cascading to their results.
    pub fn delete_picks_for_season(&mut self, season: u32) -> usize {
        let doomed: Vec<PickId> = self
            .state
            .picks
            .values()
            .filter(|p| p.season == season)
            .map(|p| p.id)
            .collect();
        for id in &doomed {
            self.state.picks.remove(id);
            self.state.results.remove(id);
            self.writes += 1;
        }
        doomed.len()
    }

    // ---- pick results ----

    pub fn ensure_result(&mut self, pick_id: PickId) -> bool {
        if self.state.results.contains_key(&pick_id) {
            return false;
        }
        self.state.results.insert(pick_id, PickResult::new(pick_id));
        self.writes += 1;
        true
    }

    pub fn result(&self, pick_id: PickId) -> Option<&PickResult> {
        self.state.results.get(&pick_id)
    }

    pub fn link_result_game(&mut self, pick_id: PickId, game_id: &str) -> bool {
        let changed = match self.state.results.get_mut(&pick_id) {
            Some(result) if result.game_id.as_deref() != Some(game_id) => {
                result.game_id = Some(game_id.to_string());
                true
            }
            _ => false,
        };
        self.wrote(changed)
    }

    /// One-directional: a locked result never unlocks.
    pub fn lock_result(&mut self, pick_id: PickId) -> bool {
        let changed = match self.state.results.get_mut(&pick_id) {
            Some(result) if !result.is_locked => {
                result.is_locked = true;
                true
            }
            _ => false,
        };
        self.wrote(changed)
    }

    pub fn set_result_survival(&mut self, pick_id: PickId, survived: bool) -> bool {
        let changed = match self.state.results.get_mut(&pick_id) {
            Some(result) if result.survived != Some(survived) => {
                result.survived = Some(survived);
                true
            }
            _ => false,
        };
        self.wrote(changed)
    }

    pub fn mark_result_invalid(&mut self, pick_id: PickId) -> bool {
        let changed = match self.state.results.get_mut(&pick_id) {
            Some(result) if result.is_valid => {
                result.is_valid = false;
                true
            }
            _ => false,
        };
        self.wrote(changed)
    }

    /// Players holding any losing result this season. Elimination is
    /// terminal, so one `survived == false` row anywhere is enough.
    pub fn eliminated_player_ids(&self, season: u32) -> BTreeSet<PlayerId> {
        self.state
            .picks
            .values()
            .filter(|p| p.season == season)
            .filter(|p| {
                self.state
                    .results
                    .get(&p.id)
                    .is_some_and(|r| r.survived == Some(false))
            })
            .map(|p| p.player_id)
            .collect()
    }
}
