//! Basic example: connect, send a few text frames and print what comes back.
//!
//! Run with: `cargo run --example basic -- ws://127.0.0.1:9001/ "hello" "world"`
//! Set `RUST_LOG=wsframe=trace` to see every frame.

use std::env;
use std::time::Duration;

use anyhow::Context;
use wsframe::{Config, Connection, Kind};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let mut args = env::args().skip(1);
    let uri = args
        .next()
        .unwrap_or_else(|| "ws://127.0.0.1:9001/".to_string());
    let messages: Vec<String> = args.collect();

    let config = Config::default().with_read_timeout(Duration::from_secs(10));
    let mut conn = Connection::with_config(&uri, config).context("invalid uri")?;

    println!("Connecting to {}...", conn.uri());
    conn.connect().context("connect")?;
    conn.handshake(None).context("handshake")?;
    if let Some(protocol) = conn.protocol() {
        println!("Server selected protocol {protocol}");
    }

    let messages = if messages.is_empty() {
        vec!["Hello World!".to_string()]
    } else {
        messages
    };
    for msg in &messages {
        conn.send_text(msg)?;
        let frame = conn.receive()?;
        match frame.kind {
            Kind::Text => println!("[{}] {}", frame.kind, frame.to_text()),
            Kind::Close => {
                println!("[close] server closed the connection");
                break;
            }
            kind => println!("[{}] {} bytes", kind, frame.payload.len()),
        }
    }

    conn.close()?;
    Ok(())
}
