use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::shared::AppError;

pub type PlayerId = String;

/// Public identity of a player, as attached to sessions and results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: PlayerId,
    pub display_name: String,
}

impl PlayerProfile {
    pub fn new(player_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Resolves player ids into profiles. Registration and login live outside
/// this service; it only reads.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn resolve_identity(&self, player_id: &str) -> Result<PlayerProfile, AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Player {player_id} is already registered as {existing_name}")]
    AlreadyRegistered {
        player_id: String,
        existing_name: String,
    },

    #[error("Player id must not be empty")]
    EmptyId,
}

/// In-memory profile directory
pub struct InMemoryIdentityLookup {
    profiles: Arc<RwLock<HashMap<PlayerId, PlayerProfile>>>,
    /// Unknown ids resolve to a fresh profile named after the id
    auto_register: bool,
}

impl InMemoryIdentityLookup {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            auto_register: false,
        }
    }

    /// Directory for a standalone server with no external identity store
    pub fn with_auto_register() -> Self {
        Self {
            auto_register: true,
            ..Self::new()
        }
    }

    pub async fn register(&self, profile: PlayerProfile) -> Result<(), IdentityError> {
        if profile.player_id.trim().is_empty() {
            return Err(IdentityError::EmptyId);
        }

        let mut profiles = self.profiles.write().await;
        if let Some(existing) = profiles.get(&profile.player_id) {
            return Err(IdentityError::AlreadyRegistered {
                player_id: profile.player_id,
                existing_name: existing.display_name.clone(),
            });
        }

        info!(
            player = %profile.player_id,
            display_name = %profile.display_name,
            "Registered player profile"
        );
        profiles.insert(profile.player_id.clone(), profile);
        Ok(())
    }

    pub async fn remove(&self, player_id: &str) -> bool {
        let mut profiles = self.profiles.write().await;
        if profiles.remove(player_id).is_some() {
            info!(player = %player_id, "Removed player profile");
            true
        } else {
            warn!(player = %player_id, "Attempted to remove unknown player profile");
            false
        }
    }
}

impl Default for InMemoryIdentityLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityLookup for InMemoryIdentityLookup {
    async fn resolve_identity(&self, player_id: &str) -> Result<PlayerProfile, AppError> {
        let profile = self.profiles.read().await.get(player_id).cloned();
        debug!(player = %player_id, found = profile.is_some(), "Identity lookup");
        if let Some(profile) = profile {
            return Ok(profile);
        }

        if !self.auto_register || player_id.trim().is_empty() {
            return Err(AppError::NotFound(format!("Player {} not found", player_id)));
        }

        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(player_id.to_string())
            .or_insert_with(|| {
                info!(player = %player_id, "Auto-registered player profile");
                PlayerProfile::new(player_id, player_id)
            })
            .clone();
        Ok(profile)
    }
}
