use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use redis::Client as RedisClient;
use shared::shared_wheel_game::SessionPlayRecord;
use thiserror::Error;
use tokio::sync::Mutex;

const KEY_PREFIX: &str = "wheel:session:";

#[derive(Debug, Error)]
pub enum PlayStoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("stored play record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("record ttl of {0:?} is out of range")]
    TtlOutOfRange(Duration),
}

/// Wheel results keyed by checkout session, each kept for `ttl`.
///
/// Redis when configured; otherwise a process-local map that is lost on
/// restart.
#[derive(Clone)]
pub enum PlayRecordStore {
    Memory {
        records: Arc<Mutex<HashMap<String, (SessionPlayRecord, Instant)>>>,
        ttl: Duration,
    },
    Redis {
        client: RedisClient,
        ttl: Duration,
    },
}

impl PlayRecordStore {
    pub fn memory(ttl: Duration) -> Self {
        PlayRecordStore::Memory {
            records: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn redis(client: RedisClient, ttl: Duration) -> Self {
        PlayRecordStore::Redis { client, ttl }
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<SessionPlayRecord>, PlayStoreError> {
        match self {
            PlayRecordStore::Memory { records, .. } => {
                let mut records = records.lock().await;
                match records.get(session_id).copied() {
                    Some((_, expires_at)) if expires_at <= Instant::now() => {
                        records.remove(session_id);
                        Ok(None)
                    }
                    Some((record, _)) => Ok(Some(record)),
                    None => Ok(None),
                }
            }
            PlayRecordStore::Redis { client, .. } => {
                let mut conn = client.get_async_connection().await?;
                let raw: Option<String> = redis::cmd("GET")
                    .arg(key(session_id))
                    .query_async(&mut conn)
                    .await?;
                match raw {
                    Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                    None => Ok(None),
                }
            }
        }
    }

    /// Stores the record unless the session already has one. Returns whether
    /// this call wrote it.
    pub async fn put_if_absent(
        &self,
        session_id: &str,
        record: SessionPlayRecord,
    ) -> Result<bool, PlayStoreError> {
        match self {
            PlayRecordStore::Memory { records, ttl } => {
                let now = Instant::now();
                let expires_at = now.checked_add(*ttl).ok_or(PlayStoreError::TtlOutOfRange(*ttl))?;
                let mut records = records.lock().await;
                // cookieless spins leave records nobody reads again
                records.retain(|_, (_, until)| *until > now);
                if records.contains_key(session_id) {
                    return Ok(false);
                }
                records.insert(session_id.to_string(), (record, expires_at));
                Ok(true)
            }
            PlayRecordStore::Redis { client, ttl } => {
                let mut conn = client.get_async_connection().await?;
                let stored: Option<String> = redis::cmd("SET")
                    .arg(key(session_id))
                    .arg(serde_json::to_string(&record)?)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl.as_secs().max(1))
                    .query_async(&mut conn)
                    .await?;
                Ok(stored.is_some())
            }
        }
    }
}

fn key(session_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, session_id)
}
