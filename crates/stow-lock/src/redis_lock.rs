//! Redis-backed lock service.
//!
//! A lease is a Redis string at the lease name holding a random token, set
//! with `SET name token NX PX ttl`. Release deletes the key only if it still
//! holds our token, checked and deleted atomically in a Lua script. Redis
//! expires abandoned leases on its own.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use redis::{Client, Connection, Script};
use tracing::debug;

use crate::error::{LockError, LockResult};
use crate::traits::{new_token, Lease, LockService};

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Bound on connecting to and talking with Redis, so a lease request never
/// waits indefinitely.
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(2);

/// A [`LockService`] coordinated through a single Redis server.
///
/// One connection is kept open and shared by all calls; it is dropped after
/// any error and re-established on the next call.
pub struct RedisLockService {
    client: Client,
    io_timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl RedisLockService {
    /// Wrap an already-configured Redis client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            io_timeout: DEFAULT_IO_TIMEOUT,
            conn: Mutex::new(None),
        }
    }

    /// Build a client from a `redis://` URL.
    pub fn open(url: &str) -> LockResult<Self> {
        let client = Client::open(url).map_err(unavailable)?;
        Ok(Self::new(client))
    }

    /// Override the connect/read/write timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    fn connect(&self) -> LockResult<Connection> {
        let conn = self
            .client
            .get_connection_with_timeout(self.io_timeout)
            .map_err(unavailable)?;
        conn.set_read_timeout(Some(self.io_timeout))
            .map_err(unavailable)?;
        conn.set_write_timeout(Some(self.io_timeout))
            .map_err(unavailable)?;
        Ok(conn)
    }

    /// Run `f` on the shared connection, connecting first if needed.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
    ) -> LockResult<T> {
        let mut slot = self.conn.lock().expect("lock poisoned");
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };
        let result = f(&mut conn).map_err(unavailable)?;
        *slot = Some(conn);
        Ok(result)
    }

    #[cfg(test)]
    fn is_connected(&self) -> bool {
        self.conn.lock().expect("lock poisoned").is_some()
    }
}

impl fmt::Debug for RedisLockService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLockService")
            .field("client", &self.client)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

fn unavailable(err: redis::RedisError) -> LockError {
    LockError::Unavailable(err.to_string())
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl LockService for RedisLockService {
    fn acquire(&self, name: &str, ttl: Duration) -> LockResult<Lease> {
        let token = new_token();
        let reply: Option<String> = self.with_connection(|conn| {
            redis::cmd("SET")
                .arg(name)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query(conn)
        })?;

        match reply {
            Some(_) => {
                debug!(name, ttl_ms = ttl_millis(ttl), "redis lease acquired");
                Ok(Lease::new(name, token, ttl))
            }
            None => Err(LockError::Held {
                name: name.to_string(),
            }),
        }
    }

    fn release(&self, lease: &Lease) -> LockResult<()> {
        let removed: i64 = self.with_connection(|conn| {
            Script::new(RELEASE_SCRIPT)
                .key(lease.name())
                .arg(lease.token())
                .invoke(conn)
        })?;

        if removed == 1 {
            debug!(name = lease.name(), "redis lease released");
            Ok(())
        } else {
            Err(LockError::Expired {
                name: lease.name().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_whole_milliseconds_and_never_zero() {
        assert_eq!(ttl_millis(Duration::from_secs(8)), 8_000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn malformed_url_is_unavailable() {
        let err = RedisLockService::open("not a url").unwrap_err();
        assert!(matches!(err, LockError::Unavailable(_)));
    }

    #[test]
    fn unreachable_server_fails_fast() {
        let svc = RedisLockService::open("redis://127.0.0.1:1/")
            .unwrap()
            .with_io_timeout(Duration::from_millis(200));
        let err = svc.acquire("user", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LockError::Unavailable(_)));
        assert!(!svc.is_connected());

        let err = svc.acquire("user", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LockError::Unavailable(_)));
    }

    /// Needs a live server: `STOW_TEST_REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored`.
    #[test]
    #[ignore]
    fn live_exclusivity_and_release() {
        let url = std::env::var("STOW_TEST_REDIS_URL").expect("STOW_TEST_REDIS_URL not set");
        let svc = RedisLockService::open(&url).unwrap();
        let name = format!("stow-test-{}", new_token());

        let lease = svc.acquire(&name, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            svc.acquire(&name, Duration::from_secs(5)).unwrap_err(),
            LockError::Held { .. }
        ));
        svc.release(&lease).unwrap();
        assert!(matches!(
            svc.release(&lease).unwrap_err(),
            LockError::Expired { .. }
        ));

        let again = svc.acquire(&name, Duration::from_secs(5)).unwrap();
        svc.release(&again).unwrap();
        assert!(svc.is_connected());
    }
}
