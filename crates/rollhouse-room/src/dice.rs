//! Dice: where a room's rolls come from.
//!
//! Rooms pull faces through the [`DiceSource`] trait so tests can replay
//! exact sequences with [`ScriptedDice`] while production uses
//! [`RandomDice`].

use rand::Rng;

/// Number of faces on each die.
pub const FACES: u8 = 6;

/// Rolls one fair six-sided die.
pub fn roll_die() -> u8 {
    rand::rng().random_range(1..=FACES)
}

/// A source of single die faces in `1..=6`.
pub trait DiceSource: Send + 'static {
    /// Returns the next face.
    fn roll_die(&mut self) -> u8;
}

/// Thread-local RNG dice.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDice;

impl DiceSource for RandomDice {
    fn roll_die(&mut self) -> u8 {
        roll_die()
    }
}

/// Replays a fixed list of pairs, wrapping around at the end.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    faces: Vec<u8>,
    next: usize,
}

impl ScriptedDice {
    /// Builds a script from `(d1, d2)` pairs. Faces outside `1..=6` are
    /// clamped into range.
    pub fn new(pairs: impl IntoIterator<Item = (u8, u8)>) -> Self {
        let faces = pairs
            .into_iter()
            .flat_map(|(a, b)| [a, b])
            .map(|f| f.clamp(1, FACES))
            .collect();
        Self { faces, next: 0 }
    }
}

impl DiceSource for ScriptedDice {
    fn roll_die(&mut self) -> u8 {
        if self.faces.is_empty() {
            return 1;
        }
        let face = self.faces[self.next % self.faces.len()];
        self.next += 1;
        face
    }
}

/// The two dice of one roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DicePair {
    pub d1: u8,
    pub d2: u8,
}

impl DicePair {
    pub fn new(d1: u8, d2: u8) -> Self {
        Self { d1, d2 }
    }

    /// Draws two independent faces from `source`.
    pub fn roll(source: &mut dyn DiceSource) -> Self {
        let d1 = source.roll_die();
        let d2 = source.roll_die();
        Self { d1, d2 }
    }

    pub fn sum(&self) -> u8 {
        self.d1 + self.d2
    }

    pub fn is_seven(&self) -> bool {
        self.sum() == 7
    }

    pub fn is_double(&self) -> bool {
        self.d1 == self.d2
    }

    /// (1,1).
    pub fn is_snake_eyes(&self) -> bool {
        self.d1 == 1 && self.d2 == 1
    }
}
