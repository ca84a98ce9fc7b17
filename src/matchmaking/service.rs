use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::queue::{JoinOutcome, MatchmakingQueue};
use crate::event::{MatchFound, PlayerNotifier, SessionEvent};
use crate::game::{Seat, SessionId};
use crate::session::SessionRegistry;
use crate::shared::AppError;
use crate::user::{IdentityLookup, PlayerProfile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    Waiting { requeued: bool },
    Matched {
        session_id: SessionId,
        opponent: PlayerProfile,
    },
}

/// Turns queue pairings into sessions and tells both players
pub struct MatchmakingService {
    queue: MatchmakingQueue,
    identity: Arc<dyn IdentityLookup>,
    registry: SessionRegistry,
    notifier: Arc<dyn PlayerNotifier>,
}

impl MatchmakingService {
    pub fn new(
        identity: Arc<dyn IdentityLookup>,
        registry: SessionRegistry,
        notifier: Arc<dyn PlayerNotifier>,
    ) -> Self {
        Self {
            queue: MatchmakingQueue::new(),
            identity,
            registry,
            notifier,
        }
    }

    pub fn queue(&self) -> &MatchmakingQueue {
        &self.queue
    }

    /// The longest-waiting player takes seat one
    #[instrument(skip(self))]
    pub async fn join(&self, player_id: &str) -> Result<MatchStatus, AppError> {
        let profile = self.identity.resolve_identity(player_id).await?;

        if let Some(session_id) = self.registry.active_session_for(player_id).await {
            return Err(AppError::BadRequest(format!(
                "Player {} is already playing in session {}",
                player_id, session_id
            )));
        }

        loop {
            let request = match self.queue.join(profile.clone()).await {
                JoinOutcome::Enqueued => {
                    info!(player = %player_id, "Player waiting for a match");
                    return Ok(MatchStatus::Waiting { requeued: false });
                }
                JoinOutcome::Requeued => {
                    info!(player = %player_id, "Player already waiting, entry refreshed");
                    return Ok(MatchStatus::Waiting { requeued: true });
                }
                JoinOutcome::Paired(request) => request,
            };
            let opponent = request.player.clone();

            match self.registry.create(opponent.clone(), profile.clone()).await {
                Ok(session_id) => {
                    self.notify(&session_id, Seat::One, &opponent, &profile).await;
                    self.notify(&session_id, Seat::Two, &profile, &opponent).await;
                    return Ok(MatchStatus::Matched {
                        session_id,
                        opponent,
                    });
                }
                Err(AppError::AlreadySeated(seated)) => {
                    // A concurrent pairing seated one of us first
                    warn!(
                        player = %player_id,
                        opponent = %opponent.player_id,
                        seated = %seated,
                        "Pairing lost a race, retrying"
                    );
                    if self
                        .registry
                        .active_session_for(&opponent.player_id)
                        .await
                        .is_none()
                    {
                        self.queue.restore(request).await;
                    }
                    if let Some(session_id) = self.registry.active_session_for(player_id).await {
                        return Err(AppError::BadRequest(format!(
                            "Player {} is already playing in session {}",
                            player_id, session_id
                        )));
                    }
                }
                Err(e) => {
                    warn!(
                        player = %player_id,
                        opponent = %opponent.player_id,
                        error = %e,
                        "Failed to create session for pairing"
                    );
                    self.queue.restore(request).await;
                    return Err(e);
                }
            }
        }
    }

    /// No-op when the player is not waiting
    #[instrument(skip(self))]
    pub async fn cancel(&self, player_id: &str) -> bool {
        let removed = self.queue.cancel(player_id).await;
        if removed {
            info!(player = %player_id, "Matchmaking request cancelled");
        }
        removed
    }

    async fn notify(
        &self,
        session_id: &str,
        seat: Seat,
        player: &PlayerProfile,
        opponent: &PlayerProfile,
    ) {
        let event = SessionEvent::MatchFound(MatchFound {
            session_id: session_id.to_string(),
            seat,
            opponent: opponent.clone(),
        });
        self.notifier.notify_player(&player.player_id, &event).await;
    }
}
