//! Voice Presence Cache
//!
//! Redis write-through mirror of the voice roster, for other processes that
//! want to see who is in a channel.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

use super::keys;
use crate::domain::{Identity, PresenceMirror};
use crate::shared::error::AppError;

/// Channel membership sets live for a day
const CHANNEL_TTL_SECS: i64 = 24 * 60 * 60;

/// A user's current-channel pointer lives for 30 minutes
const USER_TTL_SECS: u64 = 30 * 60;

/// Deletes the user's channel pointer only while it still names the channel
/// being left, so a join elsewhere is not wiped out.
const CLEAR_USER_CHANNEL: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Redis-backed presence mirror
#[derive(Clone)]
pub struct RedisPresenceMirror {
    redis: ConnectionManager,
}

impl RedisPresenceMirror {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl PresenceMirror for RedisPresenceMirror {
    async fn joined(&self, channel_id: &str, user_id: &Identity) -> Result<(), AppError> {
        let channel_key = keys::voice_channel(channel_id);
        let mut conn = self.redis.clone();

        conn.sadd::<_, _, ()>(&channel_key, user_id.as_str()).await?;
        conn.expire::<_, ()>(&channel_key, CHANNEL_TTL_SECS).await?;
        conn.set_ex::<_, _, ()>(keys::voice_user(user_id), channel_id, USER_TTL_SECS)
            .await?;

        Ok(())
    }

    async fn left(&self, channel_id: &str, user_id: &Identity) -> Result<(), AppError> {
        let mut conn = self.redis.clone();

        conn.srem::<_, _, ()>(keys::voice_channel(channel_id), user_id.as_str())
            .await?;
        let _cleared: i64 = redis::Script::new(CLEAR_USER_CHANNEL)
            .key(keys::voice_user(user_id))
            .arg(channel_id)
            .invoke_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn publish(&self, event: &str, payload: &Value) -> Result<(), AppError> {
        let message = serde_json::to_string(payload)
            .map_err(|e| AppError::Internal(format!("Failed to encode voice event: {}", e)))?;

        let mut conn = self.redis.clone();
        conn.publish::<_, _, ()>(keys::voice_events(event), message)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::create_redis_client;

    #[tokio::test]
    #[ignore = "requires Redis at REDIS_URL"]
    async fn test_leaving_old_channel_keeps_current_pointer() {
        let url = std::env::var("REDIS_URL").unwrap();
        let mut conn = create_redis_client(&url).await.unwrap();
        let mirror = RedisPresenceMirror::new(conn.clone());
        let user = Identity::new(format!("presence-{}", uuid::Uuid::new_v4()));

        mirror.joined("va", &user).await.unwrap();
        mirror.joined("vb", &user).await.unwrap();
        mirror.left("va", &user).await.unwrap();

        let current: Option<String> = conn.get(keys::voice_user(&user)).await.unwrap();
        assert_eq!(current.as_deref(), Some("vb"));

        mirror.left("vb", &user).await.unwrap();
        let current: Option<String> = conn.get(keys::voice_user(&user)).await.unwrap();
        assert_eq!(current, None);
    }
}
