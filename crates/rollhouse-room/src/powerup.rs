//! Power-up slots and their rules.
//!
//! Each player gets one slot per [`PowerupKind`]. A slot goes from unused
//! to active exactly once per game; resolving it clears `active` but
//! leaves `used` set, so it can never be activated again until a new game
//! resets the slots.
//!
//! Activating needs cover: the player's score must be at least the sum of
//! the worst-case losses (stakes) of every power-up that would be active,
//! the new one included.

use rollhouse_protocol::{PowerupKind, ServerEvent};

use crate::RoomError;
use crate::dice::DicePair;

/// Won or lost by `snake_eyes`.
pub const SNAKE_EYES_STAKE: u64 = 100;

/// Won or lost by `streak_bonus`.
pub const STREAK_BONUS_STAKE: u64 = 300;

/// Rolls a `streak_bonus` must survive to pay out.
pub const STREAK_TARGET: u32 = 3;

/// Worst-case loss of `kind` for a player currently holding `score`.
pub fn stake(kind: PowerupKind, score: u64) -> u64 {
    match kind {
        PowerupKind::SnakeEyes => SNAKE_EYES_STAKE,
        PowerupKind::StreakBonus => STREAK_BONUS_STAKE,
        PowerupKind::DoubleOrNothing => score,
    }
}

// ---------------------------------------------------------------------------
// Slot state
// ---------------------------------------------------------------------------

/// Lifetime flags shared by every kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotState {
    pub active: bool,
    pub used: bool,
}

/// `streak_bonus` also counts the rolls it has survived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub slot: SlotState,
    pub survived: u32,
}

/// One player's three slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerupSlots {
    pub snake_eyes: SlotState,
    pub streak_bonus: StreakState,
    pub double_or_nothing: SlotState,
}

impl PowerupSlots {
    pub fn slot(&self, kind: PowerupKind) -> &SlotState {
        match kind {
            PowerupKind::SnakeEyes => &self.snake_eyes,
            PowerupKind::StreakBonus => &self.streak_bonus.slot,
            PowerupKind::DoubleOrNothing => &self.double_or_nothing,
        }
    }

    fn slot_mut(&mut self, kind: PowerupKind) -> &mut SlotState {
        match kind {
            PowerupKind::SnakeEyes => &mut self.snake_eyes,
            PowerupKind::StreakBonus => &mut self.streak_bonus.slot,
            PowerupKind::DoubleOrNothing => &mut self.double_or_nothing,
        }
    }

    pub fn is_active(&self, kind: PowerupKind) -> bool {
        self.slot(kind).active
    }

    /// Kinds currently active, in [`PowerupKind::ALL`] order.
    pub fn active_kinds(&self) -> impl Iterator<Item = PowerupKind> + '_ {
        PowerupKind::ALL.into_iter().filter(|k| self.is_active(*k))
    }

    /// Score needed to activate `kind` on top of what is already active.
    pub fn required_cover(&self, kind: PowerupKind, score: u64) -> u64 {
        self.active_kinds()
            .map(|k| stake(k, score))
            .sum::<u64>()
            .saturating_add(stake(kind, score))
    }

    /// Activates `kind` for a player holding `score`.
    ///
    /// # Errors
    /// `PowerupAlreadyActive`, `PowerupAlreadyUsed`, or
    /// `InsufficientCover`; the slots are untouched on error.
    pub fn activate(&mut self, kind: PowerupKind, score: u64) -> Result<(), RoomError> {
        let slot = self.slot(kind);
        if slot.active {
            return Err(RoomError::PowerupAlreadyActive(kind));
        }
        if slot.used {
            return Err(RoomError::PowerupAlreadyUsed(kind));
        }
        let required = self.required_cover(kind, score);
        if score < required {
            return Err(RoomError::InsufficientCover { kind, required, score });
        }

        let slot = self.slot_mut(kind);
        slot.active = true;
        slot.used = true;
        if kind == PowerupKind::StreakBonus {
            self.streak_bonus.survived = 0;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The outcome of one power-up resolving for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub kind: PowerupKind,
    /// Score after the effect, floored at zero.
    pub new_score: u64,
    /// Signed change actually applied.
    pub points: i64,
    pub message: String,
}

impl Resolution {
    fn new(kind: PowerupKind, old_score: u64, new_score: u64, message: String) -> Self {
        Self {
            kind,
            new_score,
            points: if new_score >= old_score {
                i64::try_from(new_score - old_score).unwrap_or(i64::MAX)
            } else {
                i64::try_from(old_score - new_score).map_or(i64::MIN, |d| -d)
            },
            message,
        }
    }

    /// The `powerup_result` event for the owner.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::PowerupResult {
            name: self.kind,
            message: self.message.clone(),
            points: self.points,
        }
    }
}

/// Settles an active `snake_eyes` at the end of a round.
pub fn resolve_snake_eyes(slot: &mut SlotState, seen_this_round: bool, score: u64) -> Resolution {
    slot.active = false;
    if seen_this_round {
        Resolution::new(
            PowerupKind::SnakeEyes,
            score,
            score.saturating_add(SNAKE_EYES_STAKE),
            format!("🐍 Snake eyes came up! +{SNAKE_EYES_STAKE}"),
        )
    } else {
        Resolution::new(
            PowerupKind::SnakeEyes,
            score,
            score.saturating_sub(SNAKE_EYES_STAKE),
            format!("No snake eyes this round. -{SNAKE_EYES_STAKE}"),
        )
    }
}

/// Advances an active `streak_bonus` by one roll. Returns `None` while the
/// streak is still running (or the slot isn't active).
pub fn step_streak(state: &mut StreakState, dice: DicePair, score: u64) -> Option<Resolution> {
    if !state.slot.active {
        return None;
    }
    if dice.is_seven() {
        state.slot.active = false;
        return Some(Resolution::new(
            PowerupKind::StreakBonus,
            score,
            score.saturating_sub(STREAK_BONUS_STAKE),
            format!("💔 A 7 broke your streak. -{STREAK_BONUS_STAKE}"),
        ));
    }
    state.survived += 1;
    if state.survived >= STREAK_TARGET {
        state.slot.active = false;
        return Some(Resolution::new(
            PowerupKind::StreakBonus,
            score,
            score.saturating_add(STREAK_BONUS_STAKE),
            format!("⚡ Survived {STREAK_TARGET} rolls! +{STREAK_BONUS_STAKE}"),
        ));
    }
    None
}

/// Settles an active `double_or_nothing` on the roll right after it was
/// activated: a 7 doubles the score, anything else wipes it.
pub fn resolve_double_or_nothing(slot: &mut SlotState, dice: DicePair, score: u64) -> Resolution {
    slot.active = false;
    if dice.is_seven() {
        let doubled = score.saturating_mul(2);
        Resolution::new(
            PowerupKind::DoubleOrNothing,
            score,
            doubled,
            format!("🎲 Double or nothing hit a 7! Score doubled to {doubled}"),
        )
    } else {
        Resolution::new(
            PowerupKind::DoubleOrNothing,
            score,
            0,
            "💸 Double or nothing missed. Score reset to 0".to_owned(),
        )
    }
}
