//! Job orchestration: lock acquisition, audit rows, scheduling.
//!
//! Every job follows the same contract: take the shared reconcile lock (or
//! record itself skipped), write a `Running` audit row, do its whole unit of
//! work in one store transaction, and finish with a status row. A job that
//! fails drops its transaction, so the committed state is always the product
//! of a complete run. Feed failures inside a job are soft: the job logs them
//! and reconciles whatever data it has.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pool_core::{Game, JobStatus};
use pool_feeds::{
    parse_pick_sheet, FeedClient, FeedClientConfig, FeedError, OddsApiFeed, OddsFeed, ScoreFeed,
    ScoreboardFeed, SheetFeed, SheetValuesFeed, SpreadLine,
};
use pool_storage::{LockCoordinator, PoolStore, RECONCILE_LOCK_ID};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::run_full_pass;
use crate::resync::resync_picks;

pub const JOB_UPDATE_SCORES: &str = "update_scores";
pub const JOB_SHEET_RESYNC: &str = "sheet_resync";
pub const JOB_UPDATE_ODDS: &str = "update_odds";

/// What a job invocation amounted to, for callers deciding exit codes.
/// `Skipped` is normal operation: the other scheduled job held the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Skipped,
    Error,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub season: u32,
    pub lock_timeout: Duration,
    pub scoreboard_url: String,
    pub odds_url: String,
    pub odds_api_key: Option<String>,
    pub sheet_url: Option<String>,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub scheduler_enabled: bool,
    pub score_cron: String,
    pub resync_cron: String,
    pub odds_cron: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            season: 2025,
            lock_timeout: Duration::from_secs(300),
            scoreboard_url: "https://site.api.espn.com/apis/site/v2/sports/football/nfl"
                .to_string(),
            odds_url: "https://api.the-odds-api.com/v4".to_string(),
            odds_api_key: None,
            sheet_url: None,
            user_agent: "survivor-pool/0.1".to_string(),
            http_timeout_secs: 30,
            scheduler_enabled: false,
            score_cron: "0 */10 * * * *".to_string(),
            resync_cron: "0 5 * * * *".to_string(),
            odds_cron: "0 0 9 * * *".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            season: std::env::var("POOL_SEASON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.season),
            lock_timeout: std::env::var("POOL_LOCK_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_timeout),
            scoreboard_url: std::env::var("POOL_SCOREBOARD_URL")
                .unwrap_or(defaults.scoreboard_url),
            odds_url: std::env::var("POOL_ODDS_URL").unwrap_or(defaults.odds_url),
            odds_api_key: std::env::var("POOL_ODDS_API_KEY").ok().filter(|v| !v.is_empty()),
            sheet_url: std::env::var("POOL_SHEET_URL").ok().filter(|v| !v.is_empty()),
            user_agent: std::env::var("POOL_USER_AGENT").unwrap_or(defaults.user_agent),
            http_timeout_secs: std::env::var("POOL_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            scheduler_enabled: std::env::var("POOL_SCHEDULER_ENABLED")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
                .unwrap_or(defaults.scheduler_enabled),
            score_cron: std::env::var("POOL_SCORE_CRON").unwrap_or(defaults.score_cron),
            resync_cron: std::env::var("POOL_RESYNC_CRON").unwrap_or(defaults.resync_cron),
            odds_cron: std::env::var("POOL_ODDS_CRON").unwrap_or(defaults.odds_cron),
        }
    }
}

pub struct Orchestrator {
    store: PoolStore,
    locks: Arc<LockCoordinator>,
    scores: Arc<dyn ScoreFeed>,
    odds: Arc<dyn OddsFeed>,
    sheet: Arc<dyn SheetFeed>,
    config: SyncConfig,
}

impl Orchestrator {
    pub fn new(
        store: PoolStore,
        locks: Arc<LockCoordinator>,
        scores: Arc<dyn ScoreFeed>,
        odds: Arc<dyn OddsFeed>,
        sheet: Arc<dyn SheetFeed>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            locks,
            scores,
            odds,
            sheet,
            config,
        }
    }

    pub fn store(&self) -> &PoolStore {
        &self.store
    }

    /// Pull schedule and scores (optionally odds), then run the full
    /// reconciliation pass over the season's picks.
    pub async fn run_score_update(&self, fetch_odds: bool) -> JobOutcome {
        let now = Utc::now();
        let run_id = Uuid::new_v4();
        info!(job = JOB_UPDATE_SCORES, %run_id, "job starting");

        let _guard = match self.locks.acquire(RECONCILE_LOCK_ID, self.config.lock_timeout).await {
            Ok(guard) => guard,
            Err(err) => return self.record_skip(JOB_UPDATE_SCORES, &err.to_string(), now),
        };
        self.store.record_job_run(JOB_UPDATE_SCORES, JobStatus::Running, "started", now);

        match self.score_update_inner(fetch_odds, now).await {
            Ok((status, message)) => self.record_done(JOB_UPDATE_SCORES, status, &message),
            Err(err) => self.record_error(JOB_UPDATE_SCORES, &err),
        }
    }

    /// Rebuild players and picks from the commissioner's sheet, then run the
    /// full reconciliation pass so eliminations are recomputed from scratch.
    pub async fn run_sheet_resync(&self) -> JobOutcome {
        let now = Utc::now();
        let run_id = Uuid::new_v4();
        info!(job = JOB_SHEET_RESYNC, %run_id, "job starting");

        let _guard = match self.locks.acquire(RECONCILE_LOCK_ID, self.config.lock_timeout).await {
            Ok(guard) => guard,
            Err(err) => return self.record_skip(JOB_SHEET_RESYNC, &err.to_string(), now),
        };
        self.store.record_job_run(JOB_SHEET_RESYNC, JobStatus::Running, "started", now);

        match self.sheet_resync_inner(now).await {
            Ok((status, message)) => self.record_done(JOB_SHEET_RESYNC, status, &message),
            Err(err) => self.record_error(JOB_SHEET_RESYNC, &err),
        }
    }

    /// Join point spreads onto the current week's stored games. Informational
    /// only; survival never depends on odds.
    pub async fn run_odds_update(&self) -> JobOutcome {
        let now = Utc::now();
        let run_id = Uuid::new_v4();
        info!(job = JOB_UPDATE_ODDS, %run_id, "job starting");

        let _guard = match self.locks.acquire(RECONCILE_LOCK_ID, self.config.lock_timeout).await {
            Ok(guard) => guard,
            Err(err) => return self.record_skip(JOB_UPDATE_ODDS, &err.to_string(), now),
        };
        self.store.record_job_run(JOB_UPDATE_ODDS, JobStatus::Running, "started", now);

        match self.odds_update_inner().await {
            Ok((status, message)) => self.record_done(JOB_UPDATE_ODDS, status, &message),
            Err(err) => self.record_error(JOB_UPDATE_ODDS, &err),
        }
    }

    async fn score_update_inner(
        &self,
        fetch_odds: bool,
        now: DateTime<Utc>,
    ) -> Result<(JobStatus, String)> {
        let season = self.config.season;
        let current_week = self.resolve_current_week(season).await?;

        let mut status = JobStatus::Success;
        let mut games = match self.scores.schedule_and_scores(season, current_week).await {
            Ok(games) => games,
            Err(err) => {
                warn!(error = %err, "score feed unavailable; reconciling stored games only");
                status = JobStatus::Warning;
                Vec::new()
            }
        };

        if fetch_odds {
            match self.odds.point_spreads(season, current_week).await {
                Ok(spreads) => merge_spreads(&mut games, &spreads),
                Err(err) => warn!(error = %err, "odds feed unavailable; keeping stored spreads"),
            }
        }

        let mut txn = self.store.begin();
        let mut games_updated = 0usize;
        for game in games {
            if txn.upsert_game(game) {
                games_updated += 1;
            }
        }
        let pass = run_full_pass(&mut txn, season, current_week, now);
        let writes = txn.writes();
        txn.commit();

        Ok((
            status,
            format!(
                "week {current_week}: {games_updated} games updated, {} picks updated, \
                 {} stuck games fixed, {} auto-eliminations ({writes} writes)",
                pass.picks_updated, pass.stuck_games_fixed, pass.auto_eliminations
            ),
        ))
    }

    async fn sheet_resync_inner(&self, now: DateTime<Utc>) -> Result<(JobStatus, String)> {
        let season = self.config.season;
        let rows = match self.sheet.pick_rows().await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "pick sheet unavailable; keeping existing picks");
                return Ok((JobStatus::Warning, format!("sheet unavailable: {err}")));
            }
        };

        let sheet = parse_pick_sheet(&rows);
        if sheet.is_empty() {
            // A blank sheet is far more likely an upstream hiccup than the
            // whole pool quitting; never wipe state over it.
            warn!("pick sheet parsed empty; refusing destructive rebuild");
            return Ok((JobStatus::Warning, "sheet empty, rebuild skipped".to_string()));
        }

        let mut txn = self.store.begin();
        let rebuild = resync_picks(&mut txn, season, &sheet, now);
        // Completed weeks are everything before the week after the last one
        // on the schedule; the pass recomputes all eliminations from zero.
        let current_week = txn
            .max_week_with_games(season)
            .map(|week| week + 1)
            .unwrap_or(1);
        let pass = run_full_pass(&mut txn, season, current_week, now);
        let writes = txn.writes();
        txn.commit();

        Ok((
            JobStatus::Success,
            format!(
                "rebuilt {} players / {} picks, {} picks updated, {} auto-eliminations \
                 ({writes} writes)",
                rebuild.players, rebuild.picks, pass.picks_updated, pass.auto_eliminations
            ),
        ))
    }

    async fn odds_update_inner(&self) -> Result<(JobStatus, String)> {
        let season = self.config.season;
        let current_week = self.resolve_current_week(season).await?;

        let spreads = match self.odds.point_spreads(season, current_week).await {
            Ok(spreads) => spreads,
            Err(err) => {
                warn!(error = %err, "odds feed unavailable");
                return Ok((JobStatus::Warning, format!("odds unavailable: {err}")));
            }
        };
        if spreads.is_empty() {
            return Ok((JobStatus::Warning, "no spreads quoted".to_string()));
        }

        let mut txn = self.store.begin();
        let mut games = txn.games_for_week(season, current_week);
        merge_spreads(&mut games, &spreads);
        let mut games_updated = 0usize;
        for game in games {
            if txn.upsert_game(game) {
                games_updated += 1;
            }
        }
        txn.commit();

        Ok((
            JobStatus::Success,
            format!("week {current_week}: spreads on {games_updated} games"),
        ))
    }

    /// Current week comes from the score feed; a feed outage falls back to
    /// the latest week with stored games so reconciliation still runs.
    async fn resolve_current_week(&self, season: u32) -> Result<u32> {
        match self.scores.current_week(season).await {
            Ok(week) => Ok(week),
            Err(err) => match self.store.max_week_with_games(season) {
                Some(week) => {
                    warn!(error = %err, week, "current-week lookup failed; using stored schedule");
                    Ok(week)
                }
                None => bail!("no current week available and no stored games: {err}"),
            },
        }
    }

    fn record_skip(&self, job_name: &str, message: &str, now: DateTime<Utc>) -> JobOutcome {
        warn!(job = job_name, message, "reconcile lock busy; skipping run");
        self.store.record_job_run(job_name, JobStatus::Skipped, message, now);
        JobOutcome::Skipped
    }

    fn record_done(&self, job_name: &str, status: JobStatus, message: &str) -> JobOutcome {
        info!(job = job_name, ?status, message, "job finished");
        self.store.record_job_run(job_name, status, message, Utc::now());
        JobOutcome::Success
    }

    fn record_error(&self, job_name: &str, err: &anyhow::Error) -> JobOutcome {
        error!(job = job_name, error = %err, "job failed; transaction rolled back");
        self.store
            .record_job_run(job_name, JobStatus::Error, &format!("{err:#}"), Utc::now());
        JobOutcome::Error
    }

    /// Build the cron scheduler when enabled: frequent score updates, an
    /// infrequent sheet resync, and a daily odds pull, all contending for the
    /// shared lock like any other caller.
    pub async fn maybe_build_scheduler(self: &Arc<Self>) -> Result<Option<JobScheduler>> {
        if !self.config.scheduler_enabled {
            return Ok(None);
        }

        let mut sched = JobScheduler::new().await.context("creating scheduler")?;

        let scores = Arc::clone(self);
        let score_job = Job::new_async(self.config.score_cron.as_str(), move |_uuid, _lock| {
            let scores = Arc::clone(&scores);
            Box::pin(async move {
                scores.run_score_update(false).await;
            })
        })
        .with_context(|| format!("creating score job for cron {}", self.config.score_cron))?;
        sched.add(score_job).await.context("adding score job")?;

        let resync = Arc::clone(self);
        let resync_job = Job::new_async(self.config.resync_cron.as_str(), move |_uuid, _lock| {
            let resync = Arc::clone(&resync);
            Box::pin(async move {
                resync.run_sheet_resync().await;
            })
        })
        .with_context(|| format!("creating resync job for cron {}", self.config.resync_cron))?;
        sched.add(resync_job).await.context("adding resync job")?;

        let odds = Arc::clone(self);
        let odds_job = Job::new_async(self.config.odds_cron.as_str(), move |_uuid, _lock| {
            let odds = Arc::clone(&odds);
            Box::pin(async move {
                odds.run_odds_update().await;
            })
        })
        .with_context(|| format!("creating odds job for cron {}", self.config.odds_cron))?;
        sched.add(odds_job).await.context("adding odds job")?;

        Ok(Some(sched))
    }
}

fn merge_spreads(games: &mut [Game], spreads: &HashMap<String, SpreadLine>) {
    for game in games {
        if let Some(line) = spreads.get(&game.matchup_key()) {
            game.point_spread = Some(line.point_spread);
            game.favorite_team = Some(line.favorite_team.clone());
        }
    }
}

/// Placeholder for deployments without a sheet URL; every read reports the
/// feed unavailable and the resync job keeps existing picks.
struct UnconfiguredSheet;

#[async_trait]
impl SheetFeed for UnconfiguredSheet {
    async fn pick_rows(&self) -> Result<Vec<Vec<String>>, FeedError> {
        Err(FeedError::Unavailable {
            url: "<unset>".to_string(),
            reason: "no sheet URL configured".to_string(),
        })
    }
}

/// Wire a full orchestrator from environment configuration.
pub fn build_from_env() -> Result<Orchestrator> {
    let config = SyncConfig::from_env();
    let client = Arc::new(FeedClient::new(FeedClientConfig {
        timeout: Duration::from_secs(config.http_timeout_secs),
        user_agent: Some(config.user_agent.clone()),
        ..Default::default()
    })?);

    let scores = Arc::new(ScoreboardFeed::new(
        Arc::clone(&client),
        config.scoreboard_url.clone(),
    ));
    let odds = Arc::new(OddsApiFeed::new(
        Arc::clone(&client),
        config.odds_url.clone(),
        config.odds_api_key.clone(),
    ));
    let sheet: Arc<dyn SheetFeed> = match &config.sheet_url {
        Some(url) => Arc::new(SheetValuesFeed::new(client, url.clone())),
        None => Arc::new(UnconfiguredSheet),
    };

    Ok(Orchestrator::new(
        PoolStore::new(),
        Arc::new(LockCoordinator::new()),
        scores,
        odds,
        sheet,
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pool_core::{GameStatus, PICK_SOURCE_SHEET};

    struct StubScores {
        week: u32,
        games: Vec<Game>,
    }

    #[async_trait]
    impl ScoreFeed for StubScores {
        async fn current_week(&self, _season: u32) -> Result<u32, FeedError> {
            Ok(self.week)
        }

        async fn schedule_and_scores(
            &self,
            _season: u32,
            _week: u32,
        ) -> Result<Vec<Game>, FeedError> {
            Ok(self.games.clone())
        }
    }

    struct StubOdds(HashMap<String, SpreadLine>);

    #[async_trait]
    impl OddsFeed for StubOdds {
        async fn point_spreads(
            &self,
            _season: u32,
            _week: u32,
        ) -> Result<HashMap<String, SpreadLine>, FeedError> {
            Ok(self.0.clone())
        }
    }

    /// `None` simulates an unreachable sheet endpoint.
    struct StubSheet(Option<Vec<Vec<String>>>);

    #[async_trait]
    impl SheetFeed for StubSheet {
        async fn pick_rows(&self) -> Result<Vec<Vec<String>>, FeedError> {
            self.0.clone().ok_or_else(|| FeedError::Unavailable {
                url: "stub".to_string(),
                reason: "down".to_string(),
            })
        }
    }

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 7, 17, 0, 0).single().unwrap()
    }

    fn final_game(id: &str, week: u32, home: &str, away: &str, hs: i32, as_: i32) -> Game {
        let winner = if hs > as_ {
            Some(home.to_string())
        } else if as_ > hs {
            Some(away.to_string())
        } else {
            None
        };
        Game {
            id: id.to_string(),
            season: 2025,
            week,
            kickoff: kickoff(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            status: GameStatus::Final,
            home_score: Some(hs),
            away_score: Some(as_),
            winner,
            point_spread: None,
            favorite_team: None,
        }
    }

    fn orchestrator(
        scores: StubScores,
        odds: StubOdds,
        sheet: StubSheet,
    ) -> (Orchestrator, Arc<LockCoordinator>) {
        let locks = Arc::new(LockCoordinator::new());
        let orchestrator = Orchestrator::new(
            PoolStore::new(),
            Arc::clone(&locks),
            Arc::new(scores),
            Arc::new(odds),
            Arc::new(sheet),
            SyncConfig {
                lock_timeout: Duration::from_millis(20),
                ..SyncConfig::default()
            },
        );
        (orchestrator, locks)
    }

    #[tokio::test]
    async fn score_update_persists_games_and_resolves_picks() {
        let (orchestrator, _locks) = orchestrator(
            StubScores {
                week: 2,
                games: vec![final_game("g1", 1, "KC", "DEN", 24, 20)],
            },
            StubOdds(HashMap::new()),
            StubSheet(None),
        );

        let pick_id = {
            let mut txn = orchestrator.store().begin();
            let player = txn.get_or_create_player("Alice");
            let pick = txn.upsert_pick(player, 2025, 1, Some("KC"), PICK_SOURCE_SHEET, kickoff());
            txn.commit();
            pick
        };

        let outcome = orchestrator.run_score_update(false).await;
        assert_eq!(outcome, JobOutcome::Success);
        assert_eq!(
            orchestrator.store().game("g1").expect("game stored").status,
            GameStatus::Final
        );
        assert_eq!(
            orchestrator.store().result(pick_id).expect("result").survived,
            Some(true)
        );
        let record = orchestrator
            .store()
            .job_run(JOB_UPDATE_SCORES)
            .expect("audit row");
        assert_eq!(record.status, JobStatus::Success);
        assert!(record.last_success_at.is_some());
    }

    #[tokio::test]
    async fn contended_lock_skips_without_writing() {
        let (orchestrator, locks) = orchestrator(
            StubScores {
                week: 1,
                games: vec![final_game("g1", 1, "KC", "DEN", 24, 20)],
            },
            StubOdds(HashMap::new()),
            StubSheet(None),
        );

        let guard = locks
            .acquire(RECONCILE_LOCK_ID, Duration::from_millis(20))
            .await
            .expect("hold lock");
        let outcome = orchestrator.run_score_update(false).await;
        drop(guard);

        assert_eq!(outcome, JobOutcome::Skipped);
        assert!(orchestrator.store().game("g1").is_none());
        let record = orchestrator
            .store()
            .job_run(JOB_UPDATE_SCORES)
            .expect("audit row");
        assert_eq!(record.status, JobStatus::Skipped);
        assert_eq!(record.last_success_at, None);
    }

    #[tokio::test]
    async fn sheet_resync_rebuilds_and_reconciles() {
        let (orchestrator, _locks) = orchestrator(
            StubScores { week: 2, games: vec![] },
            StubOdds(HashMap::new()),
            StubSheet(Some(vec![
                vec!["Player".into(), "Week 1".into()],
                vec!["Alice".into(), "KC".into()],
                vec!["Bob".into(), "DEN".into()],
            ])),
        );

        {
            let mut txn = orchestrator.store().begin();
            txn.upsert_game(final_game("g1", 1, "KC", "DEN", 24, 20));
            txn.commit();
        }

        let outcome = orchestrator.run_sheet_resync().await;
        assert_eq!(outcome, JobOutcome::Success);

        let txn = orchestrator.store().begin();
        let picks = txn.picks_for_week(2025, 1);
        assert_eq!(picks.len(), 2);
        for pick in &picks {
            let result = txn.result(pick.id).expect("result computed");
            assert_eq!(result.survived, Some(pick.team.as_deref() == Some("KC")));
        }
    }

    #[tokio::test]
    async fn unreachable_sheet_never_wipes_picks() {
        let (orchestrator, _locks) = orchestrator(
            StubScores { week: 1, games: vec![] },
            StubOdds(HashMap::new()),
            StubSheet(None),
        );

        {
            let mut txn = orchestrator.store().begin();
            let player = txn.get_or_create_player("Alice");
            txn.upsert_pick(player, 2025, 1, Some("KC"), PICK_SOURCE_SHEET, kickoff());
            txn.commit();
        }

        let outcome = orchestrator.run_sheet_resync().await;
        assert_eq!(outcome, JobOutcome::Success);
        assert_eq!(orchestrator.store().begin().picks_for_week(2025, 1).len(), 1);
        let record = orchestrator
            .store()
            .job_run(JOB_SHEET_RESYNC)
            .expect("audit row");
        assert_eq!(record.status, JobStatus::Warning);
    }

    #[tokio::test]
    async fn empty_sheet_never_wipes_picks() {
        let (orchestrator, _locks) = orchestrator(
            StubScores { week: 1, games: vec![] },
            StubOdds(HashMap::new()),
            StubSheet(Some(vec![vec!["Player".into(), "Week 1".into()]])),
        );

        {
            let mut txn = orchestrator.store().begin();
            let player = txn.get_or_create_player("Alice");
            txn.upsert_pick(player, 2025, 1, Some("KC"), PICK_SOURCE_SHEET, kickoff());
            txn.commit();
        }

        orchestrator.run_sheet_resync().await;
        assert_eq!(orchestrator.store().begin().picks_for_week(2025, 1).len(), 1);
    }

    #[tokio::test]
    async fn odds_update_joins_spreads_onto_stored_games() {
        let mut spreads = HashMap::new();
        spreads.insert(
            "DEN_at_KC".to_string(),
            SpreadLine {
                point_spread: 8.5,
                favorite_team: "KC".to_string(),
                book: "DraftKings".to_string(),
            },
        );
        let (orchestrator, _locks) = orchestrator(
            StubScores { week: 1, games: vec![] },
            StubOdds(spreads),
            StubSheet(None),
        );

        {
            let mut txn = orchestrator.store().begin();
            txn.upsert_game(final_game("g1", 1, "KC", "DEN", 24, 20));
            txn.commit();
        }

        let outcome = orchestrator.run_odds_update().await;
        assert_eq!(outcome, JobOutcome::Success);
        let game = orchestrator.store().game("g1").expect("game stored");
        assert_eq!(game.point_spread, Some(8.5));
        assert_eq!(game.favorite_team.as_deref(), Some("KC"));
    }

    #[tokio::test]
    async fn scheduler_only_builds_when_enabled() {
        let (orchestrator, _locks) = orchestrator(
            StubScores { week: 1, games: vec![] },
            StubOdds(HashMap::new()),
            StubSheet(None),
        );
        let orchestrator = Arc::new(orchestrator);
        assert!(orchestrator
            .maybe_build_scheduler()
            .await
            .expect("scheduler build")
            .is_none());
    }
}
