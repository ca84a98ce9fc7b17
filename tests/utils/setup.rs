use std::sync::Arc;
use std::time::Duration;

use hexpop::{
    config::GameConfig,
    rewards::InMemoryResultSink,
    user::{InMemoryIdentityLookup, PlayerProfile},
    websockets::SessionMessageHandler,
    AppState,
};

use super::mocks::MockConnectionManager;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub state: AppState,
    pub connections: Arc<MockConnectionManager>,
    pub sink: Arc<InMemoryResultSink>,
    pub players: Vec<String>,
}

pub struct TestSetupBuilder {
    players: Vec<String>,
    config: GameConfig,
    auto_register: bool,
}

#[allow(dead_code)]
impl TestSetupBuilder {
    pub fn new() -> Self {
        let mut config = GameConfig::default();
        config.timing.turn_timeout = None;
        config.timing.disconnect_timeout = Duration::from_secs(5);
        config.timing.eviction_grace = Duration::from_secs(5);
        Self {
            players: vec![],
            config,
            auto_register: false,
        }
    }

    /// Identity lookup behaves like the standalone server's
    pub fn with_auto_register(mut self) -> Self {
        self.auto_register = true;
        self
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_players(self) -> Self {
        self.with_players(vec!["alice", "bob"])
    }

    pub fn with_numbered_players(mut self, count: usize) -> Self {
        self.players = (0..count).map(|i| format!("player-{}", i)).collect();
        self
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.config.timing.turn_timeout = Some(timeout);
        self
    }

    pub fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.config.timing.disconnect_timeout = timeout;
        self
    }

    pub fn with_eviction_grace(mut self, grace: Duration) -> Self {
        self.config.timing.eviction_grace = grace;
        self
    }

    pub async fn build(self) -> TestSetup {
        let identity = Arc::new(if self.auto_register {
            InMemoryIdentityLookup::with_auto_register()
        } else {
            InMemoryIdentityLookup::new()
        });
        for player in &self.players {
            identity
                .register(PlayerProfile::new(player.clone(), player.to_uppercase()))
                .await
                .unwrap();
        }

        let connections = Arc::new(MockConnectionManager::new());
        let sink = Arc::new(InMemoryResultSink::new());
        let state =
            AppState::with_connections(self.config, identity, sink.clone(), connections.clone());

        TestSetup {
            state,
            connections,
            sink,
            players: self.players,
        }
    }
}

#[allow(dead_code)]
impl TestSetup {
    /// Message handler for one player's socket
    pub fn handler(&self) -> SessionMessageHandler {
        SessionMessageHandler::new(self.state.clone())
    }
}
