use super::SessionStore;
use crate::error::StoreError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;

/// Networked [`SessionStore`] backed by Redis.
///
/// Expiry is delegated to Redis key TTLs. `take` uses `GETDEL` and therefore needs
/// Redis 6.2 or newer.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Connect and verify the connection with a `PING`.
    #[tracing::instrument(skip(url))]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let mut connection = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        tracing::info!("connected to redis session store");
        Ok(Self { connection })
    }
}

/// Redis `EX` takes whole seconds; round sub-second TTLs up so they never mean "no expiry".
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}

fn set_command(key: &str, value: String, ttl: Option<Duration>) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if let Some(ttl) = ttl {
        cmd.arg("EX").arg(ttl_seconds(ttl));
    }
    cmd
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = set_command(key, value, ttl).query_async(&mut conn).await?;
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let mut cmd = set_command(key, value, ttl);
        cmd.arg("NX");
        // SET .. NX replies OK when stored and nil otherwise
        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }
}
