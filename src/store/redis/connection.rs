//! Blocking Redis connection.

use super::commands::{self, Command};
use super::protocol::{ParseResult, Resp2Decoder};
use super::RespValue;
use crate::core::config::RedisConfig;
use crate::core::error::{StoreError, StoreResult};
use crate::store::{HashStore, ScanPage, SetCondition};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const READ_CHUNK: usize = 16 * 1024;

struct Inner {
    stream: TcpStream,
    buffer: BytesMut,
    decoder: Resp2Decoder,
    broken: bool,
}

/// Single blocking connection. Requests from several threads are serialised
/// on an internal mutex.
pub struct RedisConnection {
    inner: Mutex<Inner>,
    io_timeout: Duration,
}

impl RedisConnection {
    /// Connect, then authenticate and select the database if configured.
    pub fn connect(config: &RedisConfig) -> StoreResult<Self> {
        let stream = connect_any(&config.address, config.connect_timeout())?;
        stream.set_read_timeout(Some(config.io_timeout()))?;
        stream.set_write_timeout(Some(config.io_timeout()))?;
        stream.set_nodelay(true)?;

        let connection = Self::from_stream(stream, config.io_timeout());

        if let Some(ref password) = config.password {
            let reply = connection.execute(&Command::auth(config.username.as_deref(), password))?;
            commands::expect_ok("AUTH", reply)?;
        }
        if let Some(database) = config.database {
            commands::expect_ok("SELECT", connection.execute(&Command::select(database))?)?;
        }

        tracing::debug!(
            address = %config.address,
            database = ?config.database,
            "redis connection established"
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
    pub fn is_open(&self) -> bool {
        !self.inner.lock().broken
    }

    /// Round-trip a PING.
    pub fn ping(&self) -> StoreResult<()> {
        match self.execute(&Command::ping())?.into_result()? {
            RespValue::SimpleString(s) if s == "PONG" => Ok(()),
            other => Err(StoreError::unexpected("PING", other)),
        }
    }

    /// Send a command and wait for its reply.
    ///
    /// Error replies are returned as values; the reply helpers in
    /// [`commands`] turn them into `StoreError::Server`.
    pub fn execute(&self, command: &Command) -> StoreResult<RespValue> {
        let mut inner = self.inner.lock();
        if inner.broken {
            return Err(StoreError::Closed);
        }

        tracing::trace!(command = command.name, "redis request");

        // Stays set unless the full reply arrives; a half-read stream is unusable.
        inner.broken = true;
        let reply = self.round_trip(&mut inner, command)?;
        inner.broken = false;
        Ok(reply)
    }

    fn round_trip(&self, inner: &mut Inner, command: &Command) -> StoreResult<RespValue> {
        inner
            .stream
            .write_all(&command.encode())
            .map_err(|e| self.map_io(command.name, e))?;

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match inner.decoder.decode(&mut inner.buffer) {
                ParseResult::Ok { value, .. } => return Ok(value),
                ParseResult::Error(message) => return Err(StoreError::protocol(message)),
                ParseResult::Incomplete => {}
            }

            let n = inner
                .stream
                .read(&mut chunk)
                .map_err(|e| self.map_io(command.name, e))?;
            if n == 0 {
                return Err(StoreError::Closed);
            }
            inner.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn map_io(&self, operation: &'static str, e: std::io::Error) -> StoreError {
        match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => StoreError::Timeout {
                operation,
                timeout_ms: self.io_timeout.as_millis() as u64,
            },
            _ => StoreError::Io(e),
        }
    }
}

fn connect_any(address: &str, timeout: Duration) -> StoreResult<TcpStream> {
    let mut last_error = None;
    for addr in address.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                last_error = Some(StoreError::Timeout {
                    operation: "CONNECT",
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Err(e) => last_error = Some(StoreError::Io(e)),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        StoreError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("address resolved to nothing: {}", address),
        ))
    }))
}

impl HashStore for RedisConnection {
    fn hset(&self, key: &str, field: &[u8], value: &[u8], condition: SetCondition) -> StoreResult<bool> {
        let command = Command::hset(key, field, value, condition);
        commands::reply_bool(command.name, self.execute(&command)?)
    }

    fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Bytes>> {
        commands::reply_optional_bulk("HGET", self.execute(&Command::hget(key, field))?)
    }

    fn hexists(&self, key: &str, field: &[u8]) -> StoreResult<bool> {
        commands::reply_bool("HEXISTS", self.execute(&Command::hexists(key, field))?)
    }

    fn hdel(&self, key: &str, field: &[u8]) -> StoreResult<bool> {
        commands::reply_bool("HDEL", self.execute(&Command::hdel(key, field))?)
    }

    fn del(&self, key: &str) -> StoreResult<bool> {
        commands::reply_bool("DEL", self.execute(&Command::del(key))?)
    }

    fn hlen(&self, key: &str) -> StoreResult<u64> {
        commands::reply_count("HLEN", self.execute(&Command::hlen(key))?)
    }

    fn hkeys(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        commands::reply_bulk_list("HKEYS", self.execute(&Command::hkeys(key))?)
    }

    fn hvals(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        commands::reply_bulk_list("HVALS", self.execute(&Command::hvals(key))?)
    }

    fn hgetall(&self, key: &str) -> StoreResult<Vec<(Bytes, Bytes)>> {
        commands::reply_pairs("HGETALL", self.execute(&Command::hgetall(key))?)
    }

    fn hscan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
        commands::reply_scan("HSCAN", self.execute(&Command::hscan(key, cursor, count))?)
    }
}
