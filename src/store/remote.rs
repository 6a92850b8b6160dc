//! Redis-backed point store.
//!
//! Consumption and peeking run as Lua procedures so each call is one atomic
//! round trip. The adapter keeps no state of its own; any number of
//! instances or processes may share the same Redis.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::{PointStore, RawCounter};
use crate::error::{Result, WindowError};
use crate::procedure::{Procedure, ProcedureReply, ProcedureRunner};

/// Store client capability outside of procedures.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Delete `key`, returning the number of keys removed.
    async fn del(&self, key: &str) -> Result<u64>;
}

#[async_trait]
impl StoreClient for MultiplexedConnection {
    async fn del(&self, key: &str) -> Result<u64> {
        let mut conn = self.clone();
        let removed: u64 = conn.del(key).await?;
        Ok(removed)
    }
}

/// Static options passed through to the increment procedure.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Configured points limit
    pub points: u64,
    /// Configured window length in seconds
    pub duration_secs: u64,
    /// Replacement body for the increment procedure
    pub increment_script: Option<String>,
}

/// Builder for [`RedisStore`].
#[derive(Default)]
pub struct RedisStoreBuilder {
    client: Option<Arc<dyn StoreClient>>,
    runner: Option<Arc<dyn ProcedureRunner>>,
    options: StoreOptions,
}

impl RedisStoreBuilder {
    /// Set the client used for deletes.
    pub fn client(mut self, client: Arc<dyn StoreClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the runner that executes procedures.
    pub fn runner(mut self, runner: Arc<dyn ProcedureRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Set the configured points limit.
    pub fn points(mut self, points: u64) -> Self {
        self.options.points = points;
        self
    }

    /// Set the configured window length in seconds.
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.options.duration_secs = secs;
        self
    }

    /// Replace the increment procedure body.
    ///
    /// The replacement receives the same key and arguments and must return
    /// `{consumed, pttl}`.
    pub fn increment_script(mut self, body: impl Into<String>) -> Self {
        self.options.increment_script = Some(body.into());
        self
    }

    /// Apply a full set of options, replacing earlier setter calls.
    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the store.
    ///
    /// Fails with [`WindowError::Config`] if the client or runner is missing.
    pub fn build(self) -> Result<RedisStore> {
        let runner = self.runner.ok_or_else(|| {
            WindowError::Config("a procedure runner is required to build a RedisStore".to_string())
        })?;
        let client = self.client.ok_or_else(|| {
            WindowError::Config("a store client is required to build a RedisStore".to_string())
        })?;

        let increment = match self.options.increment_script.as_deref() {
            Some(body) => {
                debug!("Using custom increment procedure");
                Procedure::new("increment", body)
            }
            None => Procedure::increment(),
        };

        Ok(RedisStore {
            client,
            runner,
            increment,
            peek: Procedure::peek(),
            options: self.options,
        })
    }
}

/// Fixed-window point store on Redis.
pub struct RedisStore {
    client: Arc<dyn StoreClient>,
    runner: Arc<dyn ProcedureRunner>,
    increment: Procedure,
    peek: Procedure,
    options: StoreOptions,
}

impl RedisStore {
    /// Start building a store.
    pub fn builder() -> RedisStoreBuilder {
        RedisStoreBuilder::default()
    }

    /// Build a store whose client and runner are the same connection.
    pub fn from_connection(conn: MultiplexedConnection, options: StoreOptions) -> Result<Self> {
        let conn = Arc::new(conn);
        Self::builder()
            .client(conn.clone())
            .runner(conn)
            .options(options)
            .build()
    }

    /// The increment procedure in use.
    pub fn increment_procedure(&self) -> &Procedure {
        &self.increment
    }

    fn increment_args(&self, points: u64, window: Duration, force_expire: bool) -> Vec<String> {
        vec![
            points.to_string(),
            // Whole seconds, floored.
            window.as_secs().to_string(),
            force_expire.to_string(),
            self.options.points.to_string(),
            self.options.duration_secs.to_string(),
        ]
    }
}

fn to_counter(procedure: &Procedure, reply: (i64, i64)) -> Result<RawCounter> {
    let (consumed, ttl_ms) = reply;
    let consumed = u64::try_from(consumed).map_err(|_| {
        WindowError::UnexpectedReply(format!(
            "{} returned negative consumption {}",
            procedure.name(),
            consumed
        ))
    })?;
    Ok(RawCounter::new(consumed, ttl_ms))
}

#[async_trait]
impl PointStore for RedisStore {
    async fn upsert(
        &self,
        key: &str,
        points: u64,
        window: Duration,
        force_expire: bool,
    ) -> Result<RawCounter> {
        let args = self.increment_args(points, window, force_expire);
        let reply: ProcedureReply = self.runner.run(&self.increment, key, &args).await?;

        let reply = reply.ok_or_else(|| {
            WindowError::UnexpectedReply(format!("{} returned nil", self.increment.name()))
        })?;
        let counter = to_counter(&self.increment, reply)?;

        if force_expire {
            debug!(
                key = %key,
                consumed = counter.consumed,
                ttl_ms = counter.ttl_ms,
                "Forced window reset"
            );
        } else {
            trace!(
                key = %key,
                points = points,
                consumed = counter.consumed,
                ttl_ms = counter.ttl_ms,
                "Consumed points"
            );
        }

        Ok(counter)
    }

    async fn get(&self, key: &str) -> Result<Option<RawCounter>> {
        let reply = self.runner.run(&self.peek, key, &[]).await?;
        trace!(key = %key, reply = ?reply, "Peeked window");

        reply.map(|r| to_counter(&self.peek, r)).transpose()
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.client.del(key).await?;
        debug!(key = %key, removed = removed, "Deleted window");
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Mutex;

    /// Stands in for Redis by running procedure semantics on a `MemoryStore`
    /// and recording every invocation.
    #[derive(Default)]
    struct FakeRedis {
        memory: MemoryStore,
        calls: Mutex<Vec<(String, String, Vec<String>)>>,
        nil_increment: bool,
    }

    impl FakeRedis {
        fn calls(&self) -> Vec<(String, String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcedureRunner for FakeRedis {
        async fn run(&self, procedure: &Procedure, key: &str, args: &[String]) -> Result<ProcedureReply> {
            self.calls.lock().unwrap().push((
                procedure.name().to_string(),
                key.to_string(),
                args.to_vec(),
            ));

            match procedure.name() {
                "increment" if self.nil_increment => Ok(None),
                "increment" => {
                    let points: u64 = args[0].parse().unwrap();
                    let secs: u64 = args[1].parse().unwrap();
                    let force = args[2] == "true";
                    let counter = self
                        .memory
                        .upsert(key, points, Duration::from_secs(secs), force)
                        .await?;
                    Ok(Some((counter.consumed as i64, counter.ttl_ms)))
                }
                "peek" => Ok(self
                    .memory
                    .get(key)
                    .await?
                    .map(|c| (c.consumed as i64, c.ttl_ms))),
                other => panic!("unknown procedure {}", other),
            }
        }
    }

    #[async_trait]
    impl StoreClient for FakeRedis {
        async fn del(&self, key: &str) -> Result<u64> {
            Ok(self.memory.delete(key).await? as u64)
        }
    }

    fn store_with(fake: Arc<FakeRedis>) -> RedisStore {
        RedisStore::builder()
            .client(fake.clone())
            .runner(fake)
            .points(5)
            .duration_secs(1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_without_runner_fails() {
        let fake = Arc::new(FakeRedis::default());
        let result = RedisStore::builder().client(fake).build();

        assert!(matches!(result, Err(WindowError::Config(_))));
    }

    #[test]
    fn test_build_without_client_fails() {
        let fake = Arc::new(FakeRedis::default());
        let result = RedisStore::builder().runner(fake).build();

        assert!(matches!(result, Err(WindowError::Config(_))));
    }

    #[test]
    fn test_custom_increment_script() {
        let fake = Arc::new(FakeRedis::default());
        let store = RedisStore::builder()
            .client(fake.clone())
            .runner(fake)
            .increment_script("return {0, -1}")
            .build()
            .unwrap();

        assert_eq!(store.increment_procedure().body(), "return {0, -1}");
        assert_eq!(store.increment_procedure().name(), "increment");
        assert_ne!(store.increment_procedure().hash(), Procedure::increment().hash());
    }

    #[tokio::test]
    async fn test_upsert_argument_layout() {
        let fake = Arc::new(FakeRedis::default());
        let store = store_with(fake.clone());

        store
            .upsert("user:1", 2, Duration::from_millis(1500), false)
            .await
            .unwrap();
        store
            .upsert("user:1", 0, Duration::from_millis(999), true)
            .await
            .unwrap();

        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "increment");
        assert_eq!(calls[0].1, "user:1");
        assert_eq!(calls[0].2, vec!["2", "1", "false", "5", "1"]);
        // Sub-second windows floor to zero seconds.
        assert_eq!(calls[1].2, vec!["0", "0", "true", "5", "1"]);
    }

    #[tokio::test]
    async fn test_sequential_consumes_accumulate() {
        let fake = Arc::new(FakeRedis::default());
        let store = store_with(fake);
        let window = Duration::from_millis(1000);

        for i in 1..=3u64 {
            let counter = store.upsert("k", 2, window, false).await.unwrap();
            assert_eq!(counter.consumed, i * 2);
            assert!(counter.ttl_ms > 0 && counter.ttl_ms <= 1000);
        }
    }

    #[tokio::test]
    async fn test_get_uses_peek_without_args() {
        let fake = Arc::new(FakeRedis::default());
        let store = store_with(fake.clone());

        assert_eq!(store.get("missing").await.unwrap(), None);

        store.upsert("k", 3, Duration::from_secs(2), false).await.unwrap();
        let counter = store.get("k").await.unwrap().unwrap();
        assert_eq!(counter.consumed, 3);

        let calls = fake.calls();
        assert_eq!(calls[0].0, "peek");
        assert!(calls[0].2.is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let fake = Arc::new(FakeRedis::default());
        let store = store_with(fake);

        store.upsert("k", 1, Duration::from_secs(1), false).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_nil_increment_reply_is_an_error() {
        let fake = Arc::new(FakeRedis {
            nil_increment: true,
            ..Default::default()
        });
        let store = store_with(fake);

        let result = store.upsert("k", 1, Duration::from_secs(1), false).await;
        assert!(matches!(result, Err(WindowError::UnexpectedReply(_))));
    }

    #[test]
    fn test_negative_consumption_is_rejected() {
        let result = to_counter(&Procedure::increment(), (-3, 1000));
        assert!(matches!(result, Err(WindowError::UnexpectedReply(_))));
    }
}
