use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::board::{Board, CellSource, EmptyFill, SeededCellSource};
use crate::config::{FillPolicy, GameConfig};
use crate::event::{Broadcaster, SessionEnded, SessionEvent};
use crate::game::{
    GameSession, SessionId, SessionOperation, SessionSnapshot, TimerRequest, Transition,
};
use crate::rewards::{GameResult, RewardCalculator, ResultSink};
use crate::shared::AppError;
use crate::user::{PlayerId, PlayerProfile};

struct SessionEntry {
    session: GameSession,
    /// Set exactly once, when the session first reaches a terminal state
    ended: Option<SessionEnded>,
}

impl SessionEntry {
    fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = self.session.snapshot();
        if let Some(ended) = &self.ended {
            snapshot.result = Some(ended.result.clone());
            snapshot.rewards = Some(ended.rewards.clone());
        }
        snapshot
    }
}

struct ExpiredTimer {
    session_id: SessionId,
    operation: SessionOperation,
}

/// Handles hold the channel open; the driver's own copy must not, or the
/// driver would outlive every handle.
#[derive(Clone)]
enum TimerSender {
    Owner(mpsc::UnboundedSender<ExpiredTimer>),
    Driver(mpsc::WeakUnboundedSender<ExpiredTimer>),
}

impl TimerSender {
    fn weak(&self) -> mpsc::WeakUnboundedSender<ExpiredTimer> {
        match self {
            TimerSender::Owner(sender) => sender.downgrade(),
            TimerSender::Driver(weak) => weak.clone(),
        }
    }
}

/// In-memory owner of every live session.
///
/// All mutation goes through [`SessionRegistry::apply`], which holds the
/// session's own lock while the operation runs and its events are published.
/// Sessions never share a lock with each other.
///
/// Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<SessionEntry>>>>>,
    players: Arc<RwLock<HashMap<PlayerId, SessionId>>>,
    broadcaster: Broadcaster,
    rewards: Arc<RewardCalculator>,
    sink: Arc<dyn ResultSink>,
    config: Arc<GameConfig>,
    timers: TimerSender,
}

impl SessionRegistry {
    pub fn new(
        config: Arc<GameConfig>,
        broadcaster: Broadcaster,
        rewards: Arc<RewardCalculator>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self::build(config, broadcaster, rewards, sink).0
    }

    /// The driver stops once the last handle is dropped
    fn build(
        config: Arc<GameConfig>,
        broadcaster: Broadcaster,
        rewards: Arc<RewardCalculator>,
        sink: Arc<dyn ResultSink>,
    ) -> (Self, JoinHandle<()>) {
        let (timers, expired) = mpsc::unbounded_channel();
        let registry = Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            players: Arc::new(RwLock::new(HashMap::new())),
            broadcaster,
            rewards,
            sink,
            config,
            timers: TimerSender::Owner(timers),
        };
        let driver = Self {
            timers: TimerSender::Driver(registry.timers.weak()),
            ..registry.clone()
        };
        let handle = spawn_timer_driver(driver, expired);
        (registry, handle)
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Creates a session on a freshly generated board
    pub async fn create(
        &self,
        one: PlayerProfile,
        two: PlayerProfile,
    ) -> Result<SessionId, AppError> {
        let mut generator = SeededCellSource::new(rand::random());
        let board = Board::generate(&mut generator).ok_or(AppError::Internal)?;
        let source: Box<dyn CellSource> = match self.config.rules.fill_policy {
            FillPolicy::Random => Box::new(generator),
            FillPolicy::LeaveEmpty => Box::new(EmptyFill),
        };
        self.create_with(one, two, board, source).await
    }

    /// Creates a session on a given board and refill source
    #[instrument(skip(self, board, source))]
    pub async fn create_with(
        &self,
        one: PlayerProfile,
        two: PlayerProfile,
        board: Board,
        source: Box<dyn CellSource>,
    ) -> Result<SessionId, AppError> {
        if one.player_id == two.player_id {
            return Err(AppError::BadRequest(
                "A session needs two distinct players".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let session = GameSession::new(
            id.clone(),
            one.clone(),
            two.clone(),
            board,
            source,
            &self.config,
        );
        let entry = SessionEntry {
            session,
            ended: None,
        };

        {
            // Seat check and seat claim happen under one lock
            let mut players = self.players.write().await;
            let seated: Vec<&str> = [&one, &two]
                .into_iter()
                .filter(|p| players.contains_key(&p.player_id))
                .map(|p| p.player_id.as_str())
                .collect();
            if !seated.is_empty() {
                warn!(players = ?seated, "Refusing to seat players twice");
                return Err(AppError::AlreadySeated(seated.join(", ")));
            }

            players.insert(one.player_id.clone(), id.clone());
            players.insert(two.player_id.clone(), id.clone());
            self.sessions
                .write()
                .await
                .insert(id.clone(), Arc::new(Mutex::new(entry)));
        }
        self.broadcaster.open(&id).await;

        // A matched player who never connects forfeits like one who left
        for player in [&one, &two] {
            self.arm(
                &id,
                TimerRequest::Disconnect {
                    player_id: player.player_id.clone(),
                    epoch: 0,
                },
            );
        }

        info!(
            session_id = %id,
            player_one = %one.player_id,
            player_two = %two.player_id,
            "Session created"
        );
        Ok(id)
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionSnapshot, AppError> {
        let entry = self.entry(session_id).await?;
        let entry = entry.lock().await;
        Ok(entry.snapshot())
    }

    /// Applies one operation and publishes its events. Returns the events.
    ///
    /// Operations on the same session run one at a time in arrival order.
    #[instrument(skip(self, operation))]
    pub async fn apply(
        &self,
        session_id: &str,
        operation: SessionOperation,
    ) -> Result<Vec<SessionEvent>, AppError> {
        let entry = self.entry(session_id).await?;
        let mut entry = entry.lock().await;

        let Transition { mut events, timers } = entry.session.apply(operation)?;

        let terminal = entry.session.is_terminal();
        if terminal && entry.ended.is_none() {
            if let Some(ended) = self.finish(session_id, &mut entry).await {
                events.push(SessionEvent::SessionEnded(ended));
            }
        }

        for event in &events {
            self.broadcaster.publish(session_id, event.clone()).await;
        }
        if !terminal {
            for timer in timers {
                self.arm(session_id, timer);
            }
        }

        Ok(events)
    }

    /// The session a player currently sits in, if it has not ended
    pub async fn active_session_for(&self, player_id: &str) -> Option<SessionId> {
        self.players.read().await.get(player_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn entry(&self, session_id: &str) -> Result<Arc<Mutex<SessionEntry>>, AppError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn finish(&self, session_id: &str, entry: &mut SessionEntry) -> Option<SessionEnded> {
        let Some(result) = entry.session.final_result() else {
            error!(session_id = %session_id, "Terminal session without a result");
            return None;
        };

        let rewards = self.rewards.calculate(&result);
        let ended = SessionEnded { result, rewards };
        entry.ended = Some(ended.clone());

        self.release_players(session_id, &ended.result).await;
        self.persist(ended.clone());
        self.schedule_eviction(session_id);

        info!(
            session_id = %session_id,
            reason = ?ended.result.reason,
            winner = ?ended.result.winner(),
            "Session ended"
        );
        Some(ended)
    }

    async fn release_players(&self, session_id: &str, result: &GameResult) {
        let mut players = self.players.write().await;
        for player in &result.players {
            if players.get(&player.player_id).map(String::as_str) == Some(session_id) {
                players.remove(&player.player_id);
            }
        }
    }

    fn persist(&self, ended: SessionEnded) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let session_id = ended.result.session_id.clone();
            match sink.persist_result(&ended.result, &ended.rewards).await {
                Ok(()) => debug!(session_id = %session_id, "Result handed to persistence"),
                Err(e) => error!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to persist game result"
                ),
            }
        });
    }

    fn schedule_eviction(&self, session_id: &str) {
        let sessions = self.sessions.clone();
        let broadcaster = self.broadcaster.clone();
        let grace = self.config.timing.eviction_grace;
        let session_id = session_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            sessions.write().await.remove(&session_id);
            broadcaster.close(&session_id).await;
            info!(session_id = %session_id, "Session evicted");
        });
    }

    fn arm(&self, session_id: &str, request: TimerRequest) {
        let (delay, operation) = match request {
            TimerRequest::Turn { turn_seq } => match self.config.timing.turn_timeout {
                Some(timeout) => (timeout, SessionOperation::ExpireTurn { turn_seq }),
                None => return,
            },
            TimerRequest::Disconnect { player_id, epoch } => (
                self.config.timing.disconnect_timeout,
                SessionOperation::ExpireDisconnect { player_id, epoch },
            ),
        };

        let timers = self.timers.weak();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match timers.upgrade() {
                Some(sender) => {
                    let _ = sender.send(ExpiredTimer {
                        session_id,
                        operation,
                    });
                }
                None => debug!(session_id = %session_id, "Registry gone, timer dropped"),
            }
        });
    }
}

/// Feeds fired clocks back through `apply`, one task per clock
fn spawn_timer_driver(
    registry: SessionRegistry,
    mut expired: mpsc::UnboundedReceiver<ExpiredTimer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(timer) = expired.recv().await {
            let registry = registry.clone();
            tokio::spawn(async move {
                match registry.apply(&timer.session_id, timer.operation).await {
                    Ok(_) => {}
                    Err(AppError::NotFound(_)) => {
                        debug!(session_id = %timer.session_id, "Timer fired for evicted session");
                    }
                    Err(e) => {
                        warn!(session_id = %timer.session_id, error = %e, "Timer operation failed");
                    }
                }
            });
        }
        debug!("Timer driver stopped");
    })
}
