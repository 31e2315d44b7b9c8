//! Async Redis connection on tokio.

use super::commands::{self, Command};
use super::protocol::{ParseResult, Resp2Decoder};
use super::RespValue;
use crate::core::config::RedisConfig;
use crate::core::error::{StoreError, StoreResult};
use crate::store::{AsyncHashStore, ScanPage, SetCondition, StoreFuture};
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

const READ_CHUNK: usize = 16 * 1024;

struct Inner {
    stream: TcpStream,
    buffer: BytesMut,
    decoder: Resp2Decoder,
    broken: bool,
}

/// Single async connection.
///
/// One request is in flight at a time; concurrent callers queue on an async
/// mutex, so share the connection through `Arc`. Dropping a request future
/// mid-flight leaves the connection broken.
pub struct AsyncRedisConnection {
    inner: Mutex<Inner>,
    io_timeout: Duration,
}

impl AsyncRedisConnection {
    /// Connect, then authenticate and select the database if configured.
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        let connect_timeout = config.connect_timeout();
        let stream = match tokio::time::timeout(
            connect_timeout,
            TcpStream::connect(config.address.as_str()),
        )
        .await
        {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(StoreError::Timeout {
                    operation: "CONNECT",
                    timeout_ms: connect_timeout.as_millis() as u64,
                })
            }
        };
        stream.set_nodelay(true)?;

        let connection = Self::from_stream(stream, config.io_timeout());

        if let Some(ref password) = config.password {
            let reply = connection
                .execute(&Command::auth(config.username.as_deref(), password))
                .await?;
            commands::expect_ok("AUTH", reply)?;
        }
        if let Some(database) = config.database {
            let reply = connection.execute(&Command::select(database)).await?;
            commands::expect_ok("SELECT", reply)?;
        }

        tracing::debug!(
            address = %config.address,
            database = ?config.database,
            "async redis connection established"
        );

        Ok(connection)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, io_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                stream,
                buffer: BytesMut::with_capacity(READ_CHUNK),
                decoder: Resp2Decoder::new(),
                broken: false,
            }),
            io_timeout,
        }
    }

    /// Whether the connection can still be used.
    pub async fn is_open(&self) -> bool {
        !self.inner.lock().await.broken
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> StoreResult<()> {
        match self.execute(&Command::ping()).await?.into_result()? {
            RespValue::SimpleString(s) if s == "PONG" => Ok(()),
            other => Err(StoreError::unexpected("PING", other)),
        }
    }

    /// Send a command and wait for its reply, bounded by the I/O timeout.
    pub async fn execute(&self, command: &Command) -> StoreResult<RespValue> {
        let mut inner = self.inner.lock().await;
        if inner.broken {
            return Err(StoreError::Closed);
        }

        tracing::trace!(command = command.name, "redis request");

        // Cleared only after a complete reply; timeouts and dropped futures keep it set.
        inner.broken = true;
        let exchange = round_trip(&mut inner, command);
        let reply = match tokio::time::timeout(self.io_timeout, exchange).await {
            Ok(reply) => reply?,
            Err(_) => {
                return Err(StoreError::Timeout {
                    operation: command.name,
                    timeout_ms: self.io_timeout.as_millis() as u64,
                })
            }
        };
        inner.broken = false;
        Ok(reply)
    }

    fn request<'a, T, F>(&'a self, command: Command, decode: F) -> StoreFuture<'a, T>
    where
        T: Send + 'a,
        F: FnOnce(&'static str, RespValue) -> StoreResult<T> + Send + 'a,
    {
        Box::pin(async move {
            let reply = self.execute(&command).await?;
            decode(command.name, reply)
        })
    }
}

async fn round_trip(inner: &mut Inner, command: &Command) -> StoreResult<RespValue> {
    inner.stream.write_all(&command.encode()).await?;

    loop {
        match inner.decoder.decode(&mut inner.buffer) {
            ParseResult::Ok { value, .. } => return Ok(value),
            ParseResult::Error(message) => return Err(StoreError::protocol(message)),
            ParseResult::Incomplete => {}
        }

        inner.buffer.reserve(READ_CHUNK);
        let n = inner.stream.read_buf(&mut inner.buffer).await?;
        if n == 0 {
            return Err(StoreError::Closed);
        }
    }
}

impl AsyncHashStore for AsyncRedisConnection {
    fn hset<'a>(
        &'a self,
        key: &'a str,
        field: &'a [u8],
        value: &'a [u8],
        condition: SetCondition,
    ) -> StoreFuture<'a, bool> {
        self.request(Command::hset(key, field, value, condition), commands::reply_bool)
    }

    fn hget<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, Option<Bytes>> {
        self.request(Command::hget(key, field), commands::reply_optional_bulk)
    }

    fn hexists<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, bool> {
        self.request(Command::hexists(key, field), commands::reply_bool)
    }

    fn hdel<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, bool> {
        self.request(Command::hdel(key, field), commands::reply_bool)
    }

    fn del<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        self.request(Command::del(key), commands::reply_bool)
    }

    fn hlen<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64> {
        self.request(Command::hlen(key), commands::reply_count)
    }

    fn hkeys<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<Bytes>> {
        self.request(Command::hkeys(key), commands::reply_bulk_list)
    }

    fn hvals<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<Bytes>> {
        self.request(Command::hvals(key), commands::reply_bulk_list)
    }

    fn hgetall<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<(Bytes, Bytes)>> {
        self.request(Command::hgetall(key), commands::reply_pairs)
    }

    fn hscan<'a>(&'a self, key: &'a str, cursor: u64, count: usize) -> StoreFuture<'a, ScanPage> {
        self.request(Command::hscan(key, cursor, count), commands::reply_scan)
    }
}
