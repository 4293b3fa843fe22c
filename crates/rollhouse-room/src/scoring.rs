//! Pot scoring for a single roll.
//!
//! The first three rolls of a round are the early phase: every roll adds
//! to the pot and a 7 is a bonus. From the fourth roll on, doubles double
//! the pot and a 7 busts it.

use crate::dice::DicePair;

/// Rolls `1..=EARLY_PHASE_ROLLS` of a round are in the early phase.
pub const EARLY_PHASE_ROLLS: u32 = 3;

/// Added to the pot for a 7 in the early phase.
pub const EARLY_SEVEN_BONUS: u64 = 70;

/// What a roll did to the pot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredRoll {
    /// Pot after the roll.
    pub pot: u64,
    /// A late-phase 7: the pot is gone and the round is over.
    pub bust: bool,
    /// Announcement for notable rolls.
    pub message: Option<String>,
}

/// `true` for roll numbers in the early phase. `roll_count` is 1-based.
pub fn is_early(roll_count: u32) -> bool {
    roll_count <= EARLY_PHASE_ROLLS
}

/// Scores the `roll_count`-th roll of the round (1-based, already
/// incremented) against the current `pot`.
pub fn score_roll(roll_count: u32, dice: DicePair, pot: u64) -> ScoredRoll {
    let sum = u64::from(dice.sum());

    if is_early(roll_count) {
        if dice.is_seven() {
            return ScoredRoll {
                pot: pot.saturating_add(EARLY_SEVEN_BONUS),
                bust: false,
                message: Some(format!("🧨 Early 7! +{EARLY_SEVEN_BONUS} added.")),
            };
        }
        if dice.is_double() {
            return ScoredRoll {
                pot: pot.saturating_add(sum),
                bust: false,
                message: Some(format!("🎁 Early double! +{sum} added.")),
            };
        }
        return ScoredRoll { pot: pot.saturating_add(sum), bust: false, message: None };
    }

    if dice.is_seven() {
        return ScoredRoll {
            pot: 0,
            bust: true,
            message: Some("💥 Rolled a 7. Round total lost!".to_owned()),
        };
    }
    if dice.is_double() {
        let doubled = pot.saturating_mul(2);
        return ScoredRoll {
            pot: doubled,
            bust: false,
            message: Some(format!("🔥 Doubles! Round total doubled to {doubled}")),
        };
    }
    ScoredRoll { pot: pot.saturating_add(sum), bust: false, message: None }
}
