//! Wire protocol for the word impostor server.
//!
//! This crate defines the "language" that the browser client and the
//! server speak:
//!
//! - **Types** ([`PlayerId`], [`RoomCode`], [`Phase`]): identities and
//!   the round phase.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`Envelope`]):
//!   the events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room engine (events)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    ClientMessage, Envelope, HintEntry, PlayerView, RoomSnapshot, RoundResult,
    ServerMessage, VoteCount,
};
pub use types::{Phase, PlayerId, Recipient, RoomCode};

/// Protocol version announced in [`ServerMessage::Welcome`].
pub const PROTOCOL_VERSION: u32 = 1;
