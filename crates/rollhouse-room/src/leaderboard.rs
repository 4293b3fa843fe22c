//! Per-room scores, kept in join order.

use rollhouse_protocol::{Placement, RankedPlayer, Scoreboard};

/// How many players the final summary lists in `topPlayers`.
pub const TOP_PLAYERS: usize = 3;

/// Insertion-ordered `name → score` map.
///
/// Rooms hold a handful of players, so a `Vec` with linear lookup keeps
/// join order for free and is faster than hashing at this size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    entries: Vec<(String, u64)>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` with a score of zero. Returns `false` if it was already
    /// present.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.entries.push((name.to_owned(), 0));
        true
    }

    /// Removes `name`, returning its last score.
    pub fn remove(&mut self, name: &str) -> Option<u64> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    /// Overwrites the score of an existing player. Returns `false` if the
    /// player is unknown.
    pub fn set(&mut self, name: &str, score: u64) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, s)) => {
                *s = score;
                true
            }
            None => false,
        }
    }

    /// Adds `points` to an existing player and returns the new score.
    pub fn credit(&mut self, name: &str, points: u64) -> Option<u64> {
        let (_, score) = self.entries.iter_mut().find(|(n, _)| n == name)?;
        *score = score.saturating_add(points);
        Some(*score)
    }

    /// Names in join order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), *s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zeroes every score, keeping the players.
    pub fn reset_scores(&mut self) {
        for (_, score) in &mut self.entries {
            *score = 0;
        }
    }

    /// Wire snapshot for `leaderboard_update` and `game_over`.
    pub fn snapshot(&self) -> Scoreboard {
        Scoreboard(self.entries.clone())
    }

    /// Everyone, highest score first. Equal scores keep join order.
    pub fn ranking(&self) -> Vec<RankedPlayer> {
        let mut ranked: Vec<RankedPlayer> = self
            .entries
            .iter()
            .map(|(name, score)| RankedPlayer { name: name.clone(), score: *score })
            .collect();
        // sort_by is stable.
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// The first `n` of [`ranking`](Self::ranking).
    pub fn top(&self, n: usize) -> Vec<RankedPlayer> {
        let mut ranked = self.ranking();
        ranked.truncate(n);
        ranked
    }

    /// `name`'s rank (1 + players with a strictly higher score) and score.
    pub fn placement(&self, name: &str) -> Option<Placement> {
        let score = self.get(name)?;
        let above = self.entries.iter().filter(|(_, s)| *s > score).count();
        Some(Placement { rank: above + 1, score })
    }
}
