use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, username: String },

    /// A user's streak row changed (contribution recorded or sweep reset)
    StreakUpdate {
        user_id: Uuid,
        current_streak: u32,
        highest_streak: u32,
        streak_completed_today: bool,
    },

    /// A new post was published to the feed
    PostCreate {
        id: Uuid,
        author_id: Uuid,
        author_username: String,
        body: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A comment was added to a post
    CommentCreate {
        id: Uuid,
        post_id: Uuid,
        author_id: Uuid,
        author_username: String,
        body: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A user came online or went offline
    PresenceUpdate {
        user_id: Uuid,
        username: String,
        online: bool,
    },
}

impl GatewayEvent {
    /// Returns the user_id this event is scoped to, if any.
    /// Events that return `None` are global and should be delivered to all clients.
    pub fn scope_user_id(&self) -> Option<Uuid> {
        match self {
            Self::StreakUpdate { user_id, .. } => Some(*user_id),
            // Ready, PostCreate, CommentCreate, PresenceUpdate are global
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to streak updates for specific users.
    /// The server will only forward `StreakUpdate` events for subscribed
    /// users; a client always receives updates for its own user.
    Subscribe { user_ids: Vec<Uuid> },
}
