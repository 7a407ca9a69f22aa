//! # impostor
//!
//! WebSocket server for a word impostor party game.
//!
//! Players gather in a room under a short code. Each round everyone but
//! one secretly learns a word; all give a one-word hint, then vote on who
//! the impostor was. The server owns all state: clients only send events
//! and render what comes back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use impostor::prelude::*;
//!
//! # async fn start() -> Result<(), ImpostorError> {
//! let server = ImpostorServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ImpostorError;
pub use server::{ImpostorServer, ImpostorServerBuilder, ServerConfig};

/// The types most users of the server need.
pub mod prelude {
    pub use crate::{ImpostorError, ImpostorServer, ImpostorServerBuilder, ServerConfig};
    pub use impostor_protocol::{
        ClientMessage, Envelope, Phase, PlayerId, RoomCode, ServerMessage, PROTOCOL_VERSION,
    };
    pub use impostor_room::{RoomConfig, RoomError, WordList, WordListError, WordSource};
}
