use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{info, warn};
use travesia_core::reservation::{Attributes, Reservation};
use travesia_core::{keys, SessionCache, StoreError, StoreResult};

use crate::app_config::RedisConfig;

/// Redis-backed session cache. Cloning shares the multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    conn: MultiplexedConnection,
}

impl RedisClient {
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        Self::new(&config.connection_url()).await
    }

    pub async fn new(connection_string: &str) -> StoreResult<Self> {
        let client = redis::Client::open(connection_string).map_err(cache_err)?;
        let mut conn = client.get_multiplexed_async_connection().await.map_err(cache_err)?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await.map_err(cache_err)?;
        info!("Connected to Redis");
        Ok(Self { conn })
    }

    /// Ends this handle's use of the connection; it closes once every clone is dropped.
    pub fn close(self) {
        drop(self.conn);
        info!("Redis connection released");
    }

    fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

pub(crate) fn cache_err(err: redis::RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(Box::new(err))
    }
}

/// LTRIM bounds keeping the newest `max_items` entries. `0..-1` would keep
/// everything, so an empty window uses an inverted range instead.
pub(crate) fn trim_range(max_items: usize) -> (isize, isize) {
    match max_items {
        0 => (1, 0),
        n => (0, n.min(isize::MAX as usize) as isize - 1),
    }
}

#[async_trait]
impl SessionCache for RedisClient {
    async fn add_connected_user(&self, user_id: &str) -> StoreResult<()> {
        let mut conn = self.connection();
        let _: () = conn.sadd(keys::CONNECTED_USERS, user_id).await.map_err(cache_err)?;
        Ok(())
    }

    async fn remove_connected_user(&self, user_id: &str) -> StoreResult<()> {
        let mut conn = self.connection();
        let _: () = conn.srem(keys::CONNECTED_USERS, user_id).await.map_err(cache_err)?;
        Ok(())
    }

    async fn connected_users(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.connection();
        let mut users: Vec<String> = conn.smembers(keys::CONNECTED_USERS).await.map_err(cache_err)?;
        users.sort();
        Ok(users)
    }

    async fn push_recent_search(&self, user_id: &str, term: &str, max_items: usize) -> StoreResult<()> {
        let mut conn = self.connection();
        let key = keys::recent_search(user_id);
        let (start, stop) = trim_range(max_items);

        let _: () = redis::pipe()
            .atomic()
            .lpush(&key, term)
            .ignore()
            .ltrim(&key, start, stop)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(cache_err)?;
        Ok(())
    }

    async fn recent_searches(&self, user_id: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.connection();
        conn.lrange(keys::recent_search(user_id), 0, -1).await.map_err(cache_err)
    }

    async fn create_temp_reservation(&self, reservation_id: &str, attributes: &Attributes) -> StoreResult<()> {
        let mut conn = self.connection();
        let payload = serde_json::to_string(attributes)?;
        let _: () = conn
            .set(keys::temp_reservation(reservation_id), payload)
            .await
            .map_err(cache_err)?;
        info!("Temporary reservation stored: {}", reservation_id);
        Ok(())
    }

    async fn temp_reservation(&self, reservation_id: &str) -> StoreResult<Option<Attributes>> {
        let mut conn = self.connection();
        let data: Option<String> = conn.get(keys::temp_reservation(reservation_id)).await.map_err(cache_err)?;
        data.map(|payload| Reservation::from_payload(reservation_id, &payload).map(|r| r.attributes))
            .transpose()
    }

    async fn delete_temp_reservation(&self, reservation_id: &str) -> StoreResult<bool> {
        let mut conn = self.connection();
        let removed: i64 = conn.del(keys::temp_reservation(reservation_id)).await.map_err(cache_err)?;
        Ok(removed > 0)
    }

    async fn all_temp_reservations(&self) -> StoreResult<Vec<Reservation>> {
        let mut conn = self.connection();
        let found: Vec<String> = conn.keys(keys::temp_reservation_pattern()).await.map_err(cache_err)?;

        let mut reservations = Vec::with_capacity(found.len());
        for key in found {
            let Some(id) = keys::reservation_id_from_key(&key) else {
                continue;
            };
            let data: Option<String> = conn.get(&key).await.map_err(cache_err)?;
            match data {
                Some(payload) => reservations.push(Reservation::from_payload(id, &payload)?),
                // Removed between KEYS and GET
                None => warn!("Temporary reservation {} vanished during scan", id),
            }
        }
        Ok(reservations)
    }

    async fn cache_query_result(&self, key: &str, data: &Value, ttl_seconds: Option<u64>) -> StoreResult<()> {
        let mut conn = self.connection();
        let payload = serde_json::to_string(data)?;
        match ttl_seconds.filter(|ttl| *ttl > 0) {
            Some(ttl) => {
                let _: () = conn.set_ex(key, payload, ttl).await.map_err(cache_err)?;
            }
            None => {
                let _: () = conn.set(key, payload).await.map_err(cache_err)?;
            }
        }
        Ok(())
    }

    async fn cached_query(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut conn = self.connection();
        let data: Option<String> = conn.get(key).await.map_err(cache_err)?;
        Ok(data.map(|payload| serde_json::from_str(&payload)).transpose()?)
    }

    async fn flush_all(&self) -> StoreResult<()> {
        let mut conn = self.connection();
        let _: () = redis::cmd("FLUSHALL").query_async(&mut conn).await.map_err(cache_err)?;
        warn!("Redis flushed");
        Ok(())
    }
}
