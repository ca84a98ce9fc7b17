use async_trait::async_trait;

use super::events::SessionEvent;

/// Direct delivery to one player, for events that precede any session
/// subscription (such as a match being found)
#[async_trait]
pub trait PlayerNotifier: Send + Sync {
    async fn notify_player(&self, player_id: &str, event: &SessionEvent);
}
