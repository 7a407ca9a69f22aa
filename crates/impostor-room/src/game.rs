//! The room state machine: membership, round setup, hints, votes and
//! resolution.
//!
//! [`Room`] is plain data with synchronous methods. It never touches a
//! channel or a lock; each method validates one event, applies it, and
//! returns the notifications to deliver as `(Recipient, ServerMessage)`
//! pairs. The room actor owns one `Room` and does the delivery.
//!
//! Every rejected event leaves the room untouched: all checks run before
//! the first mutation.

use std::collections::BTreeMap;

use impostor_protocol::{
    HintEntry, Phase, PlayerId, PlayerView, Recipient, RoomCode, RoomSnapshot, RoundResult,
    ServerMessage, VoteCount,
};
use rand::{Rng, RngCore};

use crate::{RoomConfig, RoomError, WordSource};

/// A notification and who should get it.
pub type Outbound = (Recipient, ServerMessage);

/// One member of a room.
///
/// Treated as an immutable value: round setup swaps in fresh records
/// with the impostor flag recomputed instead of flipping a flag in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_impostor: bool,
}

impl Player {
    fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            is_impostor: false,
        }
    }

    fn with_impostor(&self, is_impostor: bool) -> Self {
        Self {
            is_impostor,
            ..self.clone()
        }
    }
}

/// Trims a display name and checks it against the configured limits.
pub fn validate_name(config: &RoomConfig, raw: &str) -> Result<String, RoomError> {
    validate_text(raw, "name", config.max_name_len)
}

fn validate_text(raw: &str, what: &str, max_len: usize) -> Result<String, RoomError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(RoomError::Validation(format!("{what} must not be empty")));
    }
    if text.chars().count() > max_len {
        return Err(RoomError::Validation(format!(
            "{what} must be at most {max_len} characters"
        )));
    }
    Ok(text.to_string())
}

/// Picks the most-accused player from a tally.
///
/// The winner is the player with the strictly greatest count. Ties go to
/// the lowest player id: the map iterates in ascending id order and a
/// later entry only wins with a strictly higher count. Returns `None`
/// for an empty tally.
pub fn tally_winner(tally: &BTreeMap<PlayerId, usize>) -> Option<PlayerId> {
    let mut winner = None;
    let mut best = 0;
    for (&player, &count) in tally {
        if count > best {
            best = count;
            winner = Some(player);
        }
    }
    winner
}

/// State of one game session.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    config: RoomConfig,
    players: BTreeMap<PlayerId, Player>,
    host: Option<PlayerId>,
    phase: Phase,
    word: Option<String>,
    impostor: Option<PlayerId>,
    round: u32,
    hints: BTreeMap<PlayerId, String>,
    votes: BTreeMap<PlayerId, PlayerId>,
    result: Option<RoundResult>,
}

impl Room {
    /// Creates a room in `Waiting` with `host` as its only member.
    ///
    /// The creator is told with `RoomCreated`; nobody else is there yet.
    pub fn create(
        code: RoomCode,
        config: RoomConfig,
        host: PlayerId,
        host_name: &str,
    ) -> Result<(Self, Vec<Outbound>), RoomError> {
        let name = validate_name(&config, host_name)?;
        let mut room = Self {
            code,
            config,
            players: BTreeMap::new(),
            host: Some(host),
            phase: Phase::Waiting,
            word: None,
            impostor: None,
            round: 0,
            hints: BTreeMap::new(),
            votes: BTreeMap::new(),
            result: None,
        };
        room.players.insert(host, Player::new(host, name));

        let out = vec![(
            Recipient::Player(host),
            ServerMessage::RoomCreated {
                code: room.code.clone(),
                room: room.snapshot(),
            },
        )];
        Ok((room, out))
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.host
    }

    pub fn impostor(&self) -> Option<PlayerId> {
        self.impostor
    }

    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    pub fn player(&self, player: PlayerId) -> Option<&Player> {
        self.players.get(&player)
    }

    /// Member ids in ascending order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn hint_count(&self) -> usize {
        self.hints.len()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Result of the last resolved round, until the next start.
    pub fn last_result(&self) -> Option<&RoundResult> {
        self.result.as_ref()
    }

    // -----------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------

    /// Adds a player. Only allowed while `Waiting`.
    pub fn add_player(&mut self, player: PlayerId, name: &str) -> Result<Vec<Outbound>, RoomError> {
        if !self.phase.is_joinable() {
            return Err(RoomError::GameInProgress(self.code.clone()));
        }
        if self.players.contains_key(&player) {
            return Err(RoomError::AlreadyInRoom(player, self.code.clone()));
        }
        let name = validate_name(&self.config, name)?;

        self.players.insert(player, Player::new(player, name));
        if self.host.is_none() {
            self.host = Some(player);
        }
        Ok(vec![self.room_state()])
    }

    /// Removes a player in any phase.
    ///
    /// The player's own hint and vote go with them, and so do votes cast
    /// against them. A departing host is replaced by the remaining member
    /// with the lowest id. If the impostor leaves (in `Hinting`, `Voting`
    /// or `Finished`), the round is abandoned: the room drops back to
    /// `Waiting` and members get `RoundAbandoned` followed by `RoomState`.
    /// Otherwise the hint and vote completion checks run again, since the
    /// smaller group may now be complete.
    pub fn remove_player(&mut self, player: PlayerId) -> Result<Vec<Outbound>, RoomError> {
        if self.players.remove(&player).is_none() {
            return Err(RoomError::NotInRoom(player));
        }
        self.hints.remove(&player);
        self.votes.remove(&player);
        self.votes.retain(|_, target| *target != player);

        if self.host == Some(player) {
            self.host = self.players.keys().next().copied();
        }

        if self.players.is_empty() {
            self.abandon_round();
            return Ok(Vec::new());
        }

        // Only set between a start and the next abandon, so never while Waiting.
        if self.impostor == Some(player) {
            self.abandon_round();
            return Ok(vec![
                (
                    Recipient::All,
                    ServerMessage::RoundAbandoned {
                        room: self.snapshot(),
                        reason: "the impostor left the game".into(),
                    },
                ),
                self.room_state(),
            ]);
        }

        let mut out = vec![self.room_state()];
        self.advance(&mut out);
        Ok(out)
    }

    // -----------------------------------------------------------------
    // Round
    // -----------------------------------------------------------------

    /// Starts a new round. Host only, from `Waiting` or `Finished`, with
    /// at least `min_players` members.
    ///
    /// Draws the word and the impostor, increments the round counter and
    /// clears hints, votes and the previous result. Each member gets its
    /// own `GameStarted`: the impostor's carries no word.
    pub fn start_game(
        &mut self,
        caller: PlayerId,
        words: &dyn WordSource,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Outbound>, RoomError> {
        if !self.players.contains_key(&caller) {
            return Err(RoomError::NotInRoom(caller));
        }
        if self.host != Some(caller) {
            return Err(RoomError::NotHost(caller));
        }
        if !self.phase.can_start() {
            return Err(RoomError::WrongPhase {
                action: "start a round",
                phase: self.phase,
            });
        }
        if self.players.len() < self.config.min_players {
            return Err(RoomError::NotEnoughPlayers {
                required: self.config.min_players,
                current: self.players.len(),
            });
        }

        let word = words.pick_word(rng);
        let index = rng.random_range(0..self.players.len());
        let Some(impostor) = self.players.keys().nth(index).copied() else {
            return Err(RoomError::NotEnoughPlayers {
                required: self.config.min_players,
                current: self.players.len(),
            });
        };

        self.players = self
            .players
            .values()
            .map(|p| (p.id, p.with_impostor(p.id == impostor)))
            .collect();
        self.reset_round();
        self.word = Some(word.clone());
        self.impostor = Some(impostor);
        self.round += 1;
        self.set_phase(Phase::Hinting);

        let room = self.snapshot();
        let out = self
            .players
            .values()
            .map(|p| {
                (
                    Recipient::Player(p.id),
                    ServerMessage::GameStarted {
                        room: room.clone(),
                        word: (!p.is_impostor).then(|| word.clone()),
                        is_impostor: p.is_impostor,
                    },
                )
            })
            .collect();
        Ok(out)
    }

    /// Records a hint. A second hint from the same player replaces the
    /// first. The last missing hint moves the room to `Voting`.
    pub fn submit_hint(&mut self, caller: PlayerId, hint: &str) -> Result<Vec<Outbound>, RoomError> {
        let Some(player) = self.players.get(&caller) else {
            return Err(RoomError::NotInRoom(caller));
        };
        if self.phase != Phase::Hinting {
            return Err(RoomError::WrongPhase {
                action: "submit a hint",
                phase: self.phase,
            });
        }
        let hint = validate_text(hint, "hint", self.config.max_hint_len)?;

        let mut out = vec![(
            Recipient::All,
            ServerMessage::HintSubmitted {
                player_id: caller,
                player_name: player.name.clone(),
            },
        )];
        self.hints.insert(caller, hint);
        self.advance(&mut out);
        Ok(out)
    }

    /// Records a vote against `target`, who must be a member (voting for
    /// yourself is allowed). A second vote replaces the first. The last
    /// missing vote resolves the round.
    pub fn submit_vote(&mut self, caller: PlayerId, target: PlayerId) -> Result<Vec<Outbound>, RoomError> {
        if !self.players.contains_key(&caller) {
            return Err(RoomError::NotInRoom(caller));
        }
        if self.phase != Phase::Voting {
            return Err(RoomError::WrongPhase {
                action: "submit a vote",
                phase: self.phase,
            });
        }
        if !self.players.contains_key(&target) {
            return Err(RoomError::Validation(format!(
                "player {target} is not in this room"
            )));
        }

        self.votes.insert(caller, target);
        let mut out = Vec::new();
        self.advance(&mut out);
        Ok(out)
    }

    /// Runs the size-based completion checks for the current phase.
    fn advance(&mut self, out: &mut Vec<Outbound>) {
        if self.players.is_empty() {
            return;
        }
        match self.phase {
            Phase::Hinting if self.hints.len() == self.players.len() => {
                self.set_phase(Phase::Voting);
                tracing::debug!(room_code = %self.code, round = self.round, "all hints in, voting");
                out.push((
                    Recipient::All,
                    ServerMessage::VotingPhase {
                        room: self.snapshot(),
                        hints: self.hint_entries(),
                    },
                ));
            }
            Phase::Voting if self.votes.len() == self.players.len() => {
                let result = self.resolve();
                out.push((
                    Recipient::All,
                    ServerMessage::GameFinished {
                        room: self.snapshot(),
                        result,
                    },
                ));
            }
            _ => {}
        }
    }

    /// Tallies the votes and moves the room to `Finished`.
    fn resolve(&mut self) -> RoundResult {
        let mut tally: BTreeMap<PlayerId, usize> = BTreeMap::new();
        for target in self.votes.values() {
            *tally.entry(*target).or_default() += 1;
        }
        let accused = tally_winner(&tally);

        // advance() only reaches Voting through start_game, which set both.
        let impostor = self.impostor.unwrap_or(PlayerId(0));
        let result = RoundResult {
            round: self.round,
            accused,
            impostor,
            impostor_found: accused == Some(impostor),
            word: self.word.clone().unwrap_or_default(),
            tally: tally
                .into_iter()
                .map(|(player_id, votes)| VoteCount { player_id, votes })
                .collect(),
            players: self.player_views(),
        };

        self.set_phase(Phase::Finished);
        self.result = Some(result.clone());
        tracing::info!(
            room_code = %self.code,
            round = self.round,
            impostor_found = result.impostor_found,
            "round resolved"
        );
        result
    }

    /// Moves along the round cycle. Only forward edges are allowed here;
    /// the way back to `Waiting` is [`abandon_round`](Self::abandon_round).
    fn set_phase(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase change {:?} -> {:?}",
            self.phase,
            next
        );
        self.phase = next;
    }

    /// Drops the current round and returns to `Waiting` from any phase.
    /// The round counter is kept.
    fn abandon_round(&mut self) {
        self.reset_round();
        self.phase = Phase::Waiting;
    }

    fn reset_round(&mut self) {
        self.word = None;
        self.impostor = None;
        self.hints.clear();
        self.votes.clear();
        self.result = None;
        self.players = self
            .players
            .values()
            .map(|p| (p.id, p.with_impostor(false)))
            .collect();
    }

    // -----------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------

    /// The public state of the room: no word, no impostor.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            phase: self.phase,
            round: self.round,
            host: self.host,
            players: self.player_views(),
            hinted: self.hints.keys().copied().collect(),
            voted: self.votes.keys().copied().collect(),
        }
    }

    fn room_state(&self) -> Outbound {
        (
            Recipient::All,
            ServerMessage::RoomState {
                room: self.snapshot(),
            },
        )
    }

    fn player_views(&self) -> Vec<PlayerView> {
        self.players
            .values()
            .map(|p| PlayerView {
                id: p.id,
                name: p.name.clone(),
                is_host: self.host == Some(p.id),
            })
            .collect()
    }

    fn hint_entries(&self) -> Vec<HintEntry> {
        self.hints
            .iter()
            .map(|(&player_id, hint)| HintEntry {
                player_id,
                player_name: self
                    .players
                    .get(&player_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                hint: hint.clone(),
            })
            .collect()
    }
}
