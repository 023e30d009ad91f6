use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::ws::PlayerOutboundMessage;

/// Broadcast hub fanning game updates out to every connection of one game.
pub struct GameRoom {
    sender: broadcast::Sender<PlayerOutboundMessage>,
}

impl GameRoom {
    /// Construct a new room backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent messages.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerOutboundMessage> {
        self.sender.subscribe()
    }

    /// Send a message to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, message: PlayerOutboundMessage) {
        let _ = self.sender.send(message);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Rooms keyed by game id, created on first subscription.
pub struct Rooms {
    rooms: DashMap<String, GameRoom>,
    capacity: usize,
}

impl Rooms {
    /// Empty registry whose rooms buffer `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a game's updates, opening its room if needed.
    pub fn subscribe(&self, game_id: &str) -> broadcast::Receiver<PlayerOutboundMessage> {
        self.rooms
            .entry(game_id.to_string())
            .or_insert_with(|| GameRoom::new(self.capacity))
            .subscribe()
    }

    /// Push a message to every subscriber of a game. No-op when nobody listens.
    pub fn broadcast(&self, game_id: &str, message: PlayerOutboundMessage) {
        if let Some(room) = self.rooms.get(game_id) {
            room.broadcast(message);
        }
    }

    /// Drop the room once its last subscriber is gone.
    pub fn release(&self, game_id: &str) {
        self.rooms
            .remove_if(game_id, |_, room| room.subscriber_count() == 0);
    }

    /// Number of open rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is open.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ws::AlertCode;

    #[tokio::test]
    async fn messages_reach_only_their_room() {
        let rooms = Rooms::new(4);
        let mut first = rooms.subscribe("a");
        let mut second = rooms.subscribe("a");
        let mut other = rooms.subscribe("b");

        rooms.broadcast("a", PlayerOutboundMessage::alert(AlertCode::Busy, "hello"));

        for receiver in [&mut first, &mut second] {
            assert!(matches!(
                receiver.recv().await.unwrap(),
                PlayerOutboundMessage::Alert {
                    code: AlertCode::Busy,
                    ..
                }
            ));
        }
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn rooms_close_with_their_last_subscriber() {
        let rooms = Rooms::new(4);
        let first = rooms.subscribe("a");
        let second = rooms.subscribe("a");
        assert_eq!(rooms.len(), 1);

        drop(first);
        rooms.release("a");
        assert_eq!(rooms.len(), 1);

        drop(second);
        rooms.release("a");
        assert!(rooms.is_empty());

        rooms.broadcast("a", PlayerOutboundMessage::alert(AlertCode::Busy, "nobody"));
    }
}
