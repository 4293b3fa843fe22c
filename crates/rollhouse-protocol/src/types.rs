//! Wire types for Rollhouse.
//!
//! Everything in this module travels over the socket as JSON. Clients send
//! [`ClientIntent`]s and receive [`ServerEvent`]s; both are internally
//! tagged by a `"type"` field whose value is the snake_case variant name,
//! and multi-word fields use camelCase (`maxRounds`, `newScore`, ...) so
//! browser clients can read them without a mapping layer.

use std::fmt;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The code players type in to find a room (e.g. `"ABCD"`).
///
/// Chosen by the host, unique within the process, never changes. Serialized
/// as a plain string via `#[serde(transparent)]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self(code.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Power-up kinds
// ---------------------------------------------------------------------------

/// The closed set of power-ups a player can activate.
///
/// On the wire these are the snake_case identifiers `snake_eyes`,
/// `streak_bonus` and `double_or_nothing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    /// Bets that a (1,1) shows up before the round ends.
    SnakeEyes,
    /// Bets on surviving three rolls without a 7.
    StreakBonus,
    /// Stakes the whole score on the very next roll being a 7.
    DoubleOrNothing,
}

impl PowerupKind {
    /// Every kind, in a fixed order.
    pub const ALL: [Self; 3] = [Self::SnakeEyes, Self::StreakBonus, Self::DoubleOrNothing];

    /// The wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SnakeEyes => "snake_eyes",
            Self::StreakBonus => "streak_bonus",
            Self::DoubleOrNothing => "double_or_nothing",
        }
    }

    /// Looks a kind up by its wire identifier. Case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for PowerupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who an outbound event is addressed to.
///
/// Rooms address players by display name; the room actor resolves names
/// to connections when it delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection subscribed to the room (players and host).
    All,
    /// One player, by display name.
    Player(String),
    /// Subscribed connections that are not players (a host screen that
    /// never joined).
    Observers,
}

// ---------------------------------------------------------------------------
// Scoreboard
// ---------------------------------------------------------------------------

/// An ordered `name → score` snapshot.
///
/// Serialized as a JSON object (`{"Ann": 42, "Bo": 0}`) whose key order is
/// the order players joined in. A `HashMap` would lose that order, and
/// the order is what breaks ties in the final ranking, so clients should
/// see the same one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoreboard(pub Vec<(String, u64)>);

impl Scoreboard {
    /// Score for `name`, if present.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when nobody is on the board.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Scoreboard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, score) in &self.0 {
            map.serialize_entry(name, score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Scoreboard {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreboardVisitor;

        impl<'de> Visitor<'de> for ScoreboardVisitor {
            type Value = Scoreboard;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of player name to score")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Scoreboard, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, score)) = access.next_entry::<String, u64>()? {
                    entries.push((name, score));
                }
                Ok(Scoreboard(entries))
            }
        }

        deserializer.deserialize_map(ScoreboardVisitor)
    }
}

/// One row of the final `topPlayers` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPlayer {
    pub name: String,
    pub score: u64,
}

/// A player's own finishing position, sent in their `game_over`.
///
/// Ties share a rank: three players tied for first are all rank 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub rank: usize,
    pub score: u64,
}

// ---------------------------------------------------------------------------
// Inbound: ClientIntent
// ---------------------------------------------------------------------------

/// The raw `maxRounds` value a host sent.
///
/// Hosts type this into a form, so it may arrive as a number, a fraction,
/// or a numeric string. Anything else is kept as `Other` so the intent as
/// a whole still decodes and the room falls back to its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RoundsHint {
    Whole(i64),
    Fraction(f64),
    Text(String),
    Other(IgnoredAny),
}

impl RoundsHint {
    /// Coerces the hint to a positive round count, or `None` if it can't
    /// be read as one.
    pub fn to_rounds(&self) -> Option<u32> {
        let value = match self {
            Self::Whole(n) => *n as f64,
            Self::Fraction(f) => *f,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Other(_) => return None,
        };
        if !value.is_finite() || value < 1.0 {
            return None;
        }
        Some(value.trunc().min(u32::MAX as f64) as u32)
    }
}

/// A message a client sends to the server.
///
/// ```json
/// { "type": "host_create", "room": "ABCD", "maxRounds": 5 }
/// { "type": "join", "room": "ABCD", "name": "Ann" }
/// { "type": "start_game" }
/// { "type": "bank" }
/// { "type": "use_powerup", "name": "snake_eyes" }
/// ```
///
/// An unrecognised `"type"` decodes to [`ClientIntent::Unknown`] rather than
/// failing, because unknown intents are ignored, not reported. A known type
/// with missing or mistyped fields is a decode error (malformed request).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientIntent {
    /// Create a room and become its host.
    HostCreate {
        room: RoomCode,
        #[serde(default)]
        max_rounds: Option<RoundsHint>,
    },

    /// Join a room as a named player. A missing name is treated as empty
    /// so it gets the "Name cannot be empty." reply.
    Join {
        room: RoomCode,
        #[serde(default)]
        name: String,
    },

    /// Host only: start the game in the caller's room.
    StartGame,

    /// Claim the current pot.
    Bank,

    /// Activate a power-up by wire identifier. Kept as a string so an
    /// unknown identifier gets a specific error instead of "malformed".
    UsePowerup { name: String },

    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Outbound: ServerEvent
// ---------------------------------------------------------------------------

/// A message the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Unicast to the host after `host_create`.
    RoomCreated { room: RoomCode },

    /// Unicast to whoever sent a failing intent.
    Error { message: String },

    /// Current player names, in join order.
    LobbyUpdate { players: Vec<String> },

    /// Full score snapshot.
    LeaderboardUpdate { leaderboard: Scoreboard },

    /// The host started a game.
    GameStart { players: Vec<String>, max_rounds: u32 },

    /// A new round began.
    RoundUpdate { round: u32, max_rounds: u32 },

    /// The next roll fires at `roll_time` (Unix epoch milliseconds).
    RollScheduled { roll_time: u64 },

    /// The dice landed. `pot` is the round total after scoring.
    Roll {
        d1: u8,
        d2: u8,
        sum: u8,
        pot: u64,
        message: Option<String>,
    },

    /// A player claimed their share (or was force-banked).
    Banked { name: String, new_score: u64 },

    /// Unicast to the player whose activation succeeded.
    PowerupActivated { name: PowerupKind },

    /// Broadcast when a player activates a power-up.
    PowerupUsed { player: String, name: PowerupKind },

    /// Unicast to the owner when their power-up resolves. `points` is the
    /// signed change actually applied to their score.
    PowerupResult {
        name: PowerupKind,
        message: String,
        points: i64,
    },

    /// Per-connection final summary. `your_placement` is `null` for a host
    /// that never joined as a player.
    GameOver {
        leaderboard: Scoreboard,
        top_players: Vec<RankedPlayer>,
        your_placement: Option<Placement>,
    },
}

// =========================================================================
// Tests
// =========================================================================
