//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use remote_collections::core::config::{ClientConfig, RedisConfig};
use remote_collections::store::redis::{ParseResult, Resp2Encoder, Resp2Parser, RespValue};
use remote_collections::{CollectionFactory, MemoryHashStore};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::JoinHandle;
use tempfile::NamedTempFile;

/// Create a minimal valid configuration file.
pub fn create_minimal_config() -> NamedTempFile {
    create_config_file(
        r#"
[redis]
address = "127.0.0.1:6379"
"#,
    )
}

/// Write arbitrary configuration content to a temp file.
pub fn create_config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

/// Load a config from a temp file.
pub fn load_config(file: &NamedTempFile) -> ClientConfig {
    ClientConfig::from_file(file.path()).expect("Failed to load config")
}

/// Factory over a fresh in-memory store, returning the store as well.
pub fn memory_factory() -> (Arc<MemoryHashStore>, CollectionFactory<MemoryHashStore>) {
    let store = Arc::new(MemoryHashStore::new());
    let factory = CollectionFactory::new(Arc::clone(&store));
    (store, factory)
}

pub fn s(value: &str) -> String {
    value.to_string()
}

// ============================================================================
// Scripted RESP server
// ============================================================================

/// What the scripted server does with the next command it receives.
pub enum Step {
    /// Send this value.
    Reply(RespValue),
    /// Send raw bytes.
    Raw(&'static [u8]),
    /// Never answer; hold the connection until the client goes away.
    Silent,
}

/// A one-connection server answering commands from a script.
pub struct ScriptedServer {
    pub address: String,
    handle: JoinHandle<Vec<Vec<String>>>,
}

impl ScriptedServer {
    /// Start listening on an ephemeral localhost port.
    pub fn start(script: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        let address = listener.local_addr().expect("No local addr").to_string();
        let handle = std::thread::spawn(move || serve(listener, script));
        Self { address, handle }
    }

    /// Redis config pointing at this server with short timeouts.
    pub fn config(&self) -> RedisConfig {
        let mut config = RedisConfig::new(self.address.clone());
        config.connect_timeout_ms = 1_000;
        config.io_timeout_ms = 1_000;
        config
    }

    /// Wait for the script to finish and return every command received.
    pub fn finish(self) -> Vec<Vec<String>> {
        self.handle.join().expect("Server thread panicked")
    }
}

fn serve(listener: TcpListener, script: Vec<Step>) -> Vec<Vec<String>> {
    let mut received = Vec::new();
    let Ok((mut stream, _)) = listener.accept() else {
        return received;
    };
    let mut buffer = Vec::new();

    for step in script {
        let Some(command) = read_command(&mut stream, &mut buffer) else {
            return received;
        };
        received.push(command);

        match step {
            Step::Reply(value) => {
                if stream.write_all(&Resp2Encoder::encode(&value)).is_err() {
                    return received;
                }
            }
            Step::Raw(bytes) => {
                if stream.write_all(bytes).is_err() {
                    return received;
                }
            }
            Step::Silent => {
                let mut sink = [0u8; 256];
                while matches!(stream.read(&mut sink), Ok(n) if n > 0) {}
                return received;
            }
        }
    }
    received
}

fn read_command(stream: &mut std::net::TcpStream, buffer: &mut Vec<u8>) -> Option<Vec<String>> {
    loop {
        match Resp2Parser::parse(buffer) {
            ParseResult::Ok { value, consumed } => {
                buffer.drain(..consumed);
                let parts = value.into_array()?;
                return Some(
                    parts
                        .into_iter()
                        .filter_map(RespValue::into_bytes)
                        .map(|b| String::from_utf8_lossy(&b).into_owned())
                        .collect(),
                );
            }
            ParseResult::Error(_) => return None,
            ParseResult::Incomplete => {}
        }

        let mut chunk = [0u8; 4096];
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Build an expected command line.
pub fn cmd(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}
