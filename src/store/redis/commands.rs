//! Hash command builders and reply decoding.
//!
//! Both connection types share these so the command/reply mapping exists once.

use super::protocol::Resp2Encoder;
use super::RespValue;
use crate::core::error::{StoreError, StoreResult};
use crate::store::{ScanPage, SetCondition};
use bytes::Bytes;

/// A Redis command ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name (uppercase).
    pub name: &'static str,

    /// Command arguments.
    pub args: Vec<Bytes>,
}

impl Command {
    /// Create a command with no arguments.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append an argument by copying a slice.
    pub fn arg_slice(self, arg: &[u8]) -> Self {
        self.arg(Bytes::copy_from_slice(arg))
    }

    /// Encode as a RESP2 array of bulk strings.
    pub fn encode(&self) -> Vec<u8> {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(Bytes::from_static(self.name.as_bytes()));
        parts.extend(self.args.iter().cloned());
        Resp2Encoder::encode_command(&parts)
    }

    pub fn ping() -> Self {
        Self::new("PING")
    }

    pub fn auth(username: Option<&str>, password: &str) -> Self {
        let cmd = Self::new("AUTH");
        let cmd = match username {
            Some(user) => cmd.arg(user.to_string()),
            None => cmd,
        };
        cmd.arg(password.to_string())
    }

    pub fn select(database: u32) -> Self {
        Self::new("SELECT").arg(database.to_string())
    }

    pub fn hset(key: &str, field: &[u8], value: &[u8], condition: SetCondition) -> Self {
        let name = match condition {
            SetCondition::Always => "HSET",
            SetCondition::NotExists => "HSETNX",
        };
        Self::new(name)
            .arg(key.to_string())
            .arg_slice(field)
            .arg_slice(value)
    }

    pub fn hget(key: &str, field: &[u8]) -> Self {
        Self::new("HGET").arg(key.to_string()).arg_slice(field)
    }

    pub fn hexists(key: &str, field: &[u8]) -> Self {
        Self::new("HEXISTS").arg(key.to_string()).arg_slice(field)
    }

    pub fn hdel(key: &str, field: &[u8]) -> Self {
        Self::new("HDEL").arg(key.to_string()).arg_slice(field)
    }

    pub fn del(key: &str) -> Self {
        Self::new("DEL").arg(key.to_string())
    }

    pub fn hlen(key: &str) -> Self {
        Self::new("HLEN").arg(key.to_string())
    }

    pub fn hkeys(key: &str) -> Self {
        Self::new("HKEYS").arg(key.to_string())
    }

    pub fn hvals(key: &str) -> Self {
        Self::new("HVALS").arg(key.to_string())
    }

    pub fn hgetall(key: &str) -> Self {
        Self::new("HGETALL").arg(key.to_string())
    }

    pub fn hscan(key: &str, cursor: u64, count: usize) -> Self {
        Self::new("HSCAN")
            .arg(key.to_string())
            .arg(cursor.to_string())
            .arg("COUNT")
            .arg(count.max(1).to_string())
    }
}

/// `+OK` (AUTH, SELECT).
pub fn expect_ok(command: &'static str, reply: RespValue) -> StoreResult<()> {
    match reply.into_result()? {
        RespValue::SimpleString(s) if s == "OK" => Ok(()),
        other => Err(StoreError::unexpected(command, other)),
    }
}

/// Integer reply read as "at least one" (HSET, HSETNX, HEXISTS, HDEL, DEL).
pub fn reply_bool(command: &'static str, reply: RespValue) -> StoreResult<bool> {
    match reply.into_result()? {
        RespValue::Integer(n) => Ok(n > 0),
        other => Err(StoreError::unexpected(command, other)),
    }
}

/// Non-negative integer reply (HLEN).
pub fn reply_count(command: &'static str, reply: RespValue) -> StoreResult<u64> {
    match reply.into_result()? {
        RespValue::Integer(n) if n >= 0 => Ok(n as u64),
        other => Err(StoreError::unexpected(command, other)),
    }
}

/// Bulk or null reply (HGET).
pub fn reply_optional_bulk(command: &'static str, reply: RespValue) -> StoreResult<Option<Bytes>> {
    match reply.into_result()? {
        RespValue::Null => Ok(None),
        RespValue::BulkString(b) => Ok(Some(b)),
        other => Err(StoreError::unexpected(command, other)),
    }
}

/// Array of bulk strings (HKEYS, HVALS).
pub fn reply_bulk_list(command: &'static str, reply: RespValue) -> StoreResult<Vec<Bytes>> {
    match reply.into_result()? {
        RespValue::Null => Ok(Vec::new()),
        RespValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                RespValue::BulkString(b) => Ok(b),
                other => Err(StoreError::unexpected(command, other)),
            })
            .collect(),
        other => Err(StoreError::unexpected(command, other)),
    }
}

/// Flat field/value array (HGETALL).
pub fn reply_pairs(command: &'static str, reply: RespValue) -> StoreResult<Vec<(Bytes, Bytes)>> {
    let items = reply_bulk_list(command, reply)?;
    pair_up(command, items)
}

/// `[cursor, [field, value, ...]]` (HSCAN).
pub fn reply_scan(command: &'static str, reply: RespValue) -> StoreResult<ScanPage> {
    let reply = reply.into_result()?;
    let parts = match reply {
        RespValue::Array(parts) if parts.len() == 2 => parts,
        other => return Err(StoreError::unexpected(command, other)),
    };
    let mut parts = parts.into_iter();
    let (Some(cursor), Some(entries)) = (parts.next(), parts.next()) else {
        return Err(StoreError::unexpected(command, "short reply"));
    };

    let cursor = match cursor.as_int() {
        Some(n) if n >= 0 => n as u64,
        _ => return Err(StoreError::unexpected(command, cursor)),
    };
    let entries = pair_up(command, reply_bulk_list(command, entries)?)?;

    Ok(ScanPage { cursor, entries })
}

fn pair_up(command: &'static str, items: Vec<Bytes>) -> StoreResult<Vec<(Bytes, Bytes)>> {
    if items.len() % 2 != 0 {
        return Err(StoreError::unexpected(
            command,
            format!("odd number of elements ({})", items.len()),
        ));
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((field, value));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditional_set_picks_command() {
        let cmd = Command::hset("k", b"f", b"v", SetCondition::NotExists);
        assert_eq!(cmd.name, "HSETNX");
        assert_eq!(cmd.args.len(), 3);

        let cmd = Command::hset("k", b"f", b"v", SetCondition::Always);
        assert_eq!(cmd.name, "HSET");
    }

    #[test]
    fn test_hscan_encoding() {
        let cmd = Command::hscan("Dictionary+d", 42, 0);
        assert_eq!(
            cmd.encode(),
            b"*5\r\n$5\r\nHSCAN\r\n$12\r\nDictionary+d\r\n$2\r\n42\r\n$5\r\nCOUNT\r\n$1\r\n1\r\n"
        );
    }

    #[test]
    fn test_auth_with_and_without_username() {
        assert_eq!(Command::auth(None, "pw").args.len(), 1);
        assert_eq!(Command::auth(Some("app"), "pw").args.len(), 2);
    }

    #[test]
    fn test_reply_bool() {
        assert!(reply_bool("HSETNX", RespValue::Integer(1)).unwrap());
        assert!(!reply_bool("HSETNX", RespValue::Integer(0)).unwrap());
        assert!(matches!(
            reply_bool("HDEL", RespValue::bulk("1")),
            Err(StoreError::UnexpectedReply { command: "HDEL", .. })
        ));
    }

    #[test]
    fn test_server_error_surfaces_unchanged() {
        let err = reply_count("HLEN", RespValue::error("WRONGTYPE", "bad type")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Server { ref kind, ref message } if kind == "WRONGTYPE" && message == "bad type"
        ));
    }

    #[test]
    fn test_reply_optional_bulk() {
        assert_eq!(reply_optional_bulk("HGET", RespValue::Null).unwrap(), None);
        assert_eq!(
            reply_optional_bulk("HGET", RespValue::bulk("v")).unwrap(),
            Some(Bytes::from_static(b"v"))
        );
    }

    #[test]
    fn test_reply_pairs() {
        let reply = RespValue::array(vec![
            RespValue::bulk("f1"),
            RespValue::bulk("v1"),
            RespValue::bulk("f2"),
            RespValue::bulk("v2"),
        ]);
        let pairs = reply_pairs("HGETALL", reply).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0.as_ref(), b"f2");

        let odd = RespValue::array(vec![RespValue::bulk("f1")]);
        assert!(reply_pairs("HGETALL", odd).is_err());
    }

    #[test]
    fn test_reply_scan() {
        let reply = RespValue::array(vec![
            RespValue::bulk("17"),
            RespValue::array(vec![RespValue::bulk("f"), RespValue::bulk("v")]),
        ]);
        let page = reply_scan("HSCAN", reply).unwrap();
        assert_eq!(page.cursor, 17);
        assert_eq!(page.entries.len(), 1);
        assert!(!page.is_last());

        let done = RespValue::array(vec![RespValue::bulk("0"), RespValue::array(vec![])]);
        assert!(reply_scan("HSCAN", done).unwrap().is_last());
    }
}
