//! Word impostor game server.
//!
//! Environment:
//! - `IMPOSTOR_BIND`: listen address. Falls back to `0.0.0.0:$PORT`, then
//!   `0.0.0.0:3000`.
//! - `IMPOSTOR_WORDS`: path to a `{"words": [...]}` file, default
//!   `words.json`. The built-in list is used if it cannot be loaded.
//! - `RUST_LOG`: log filter, default `info`.

use impostor::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: &str = "3000";
const DEFAULT_WORDS: &str = "words.json";

fn bind_addr() -> String {
    if let Ok(addr) = std::env::var("IMPOSTOR_BIND") {
        return addr;
    }
    let port = std::env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
    format!("0.0.0.0:{port}")
}

fn load_words() -> WordList {
    let path = std::env::var("IMPOSTOR_WORDS").unwrap_or_else(|_| DEFAULT_WORDS.to_string());
    match WordList::from_json_file(&path) {
        Ok(words) => {
            tracing::info!(%path, count = words.len(), "loaded word list");
            words
        }
        Err(e) => {
            tracing::warn!(%path, error = %e, "using built-in word list");
            WordList::fallback()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ImpostorError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = ImpostorServer::builder()
        .bind(&bind_addr())
        .words(load_words())
        .build()
        .await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
