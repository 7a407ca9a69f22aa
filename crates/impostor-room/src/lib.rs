//! Rooms for the word impostor game.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! [`Room`] state machine and its players' outbound channels. The
//! [`RoomDirectory`] sits in front of all of them.
//!
//! # Key types
//!
//! - [`RoomDirectory`]: creates and destroys rooms, routes connections
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: the phase machine: waiting, hinting, voting, finished
//! - [`ConnectionRegistry`]: which connection is in which room
//! - [`WordSource`] / [`WordList`]: where secret words come from
//! - [`RoomConfig`]: shared room settings

mod config;
mod directory;
mod error;
mod game;
mod registry;
mod room;
mod words;

pub use config::RoomConfig;
pub use directory::{RoomDirectory, generate_code};
pub use error::{RoomError, WordListError};
pub use game::{Outbound, Player, Room, tally_winner, validate_name};
pub use registry::{ConnectionRegistry, Registration};
pub use room::{PlayerSender, RoomHandle, RoomInfo};
pub use words::{WordList, WordSource};
