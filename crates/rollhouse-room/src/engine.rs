//! The round engine: a room's game state machine, without any I/O.
//!
//! Every operation mutates the engine and returns a [`Step`]: the events to
//! deliver, in order, and what to do with the room's single timer. The room
//! actor owns the timer and the connections; the engine only decides.
//!
//! ```text
//!            start_game
//! Idle ──────────────────→ AwaitingRoll ──roll──→ AwaitingRoll ...
//!   ↑                         │    │
//!   │                    bust │    │ all banked
//!   │                         ↓    ↓
//!   │                    Resolving ─→ next round (AwaitingRoll)
//!   │                                       │
//!   └────────── game over ←─────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rollhouse_protocol::{PowerupKind, Recipient, ServerEvent};

use crate::dice::{DicePair, DiceSource};
use crate::leaderboard::{Leaderboard, TOP_PLAYERS};
use crate::powerup::{
    PowerupSlots, Resolution, resolve_double_or_nothing, resolve_snake_eyes, step_streak,
};
use crate::scoring::score_roll;
use crate::{RoomConfig, RoomError, RoomState};

/// An event and who gets it.
pub type Outbound = (Recipient, ServerEvent);

/// What the room timer runs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Roll the dice.
    Roll,
    /// Leave the bust pause and move to the next round.
    AdvanceRound,
}

/// What the actor should do with its timer after a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerDirective {
    /// Leave whatever is scheduled alone.
    #[default]
    Keep,
    /// Drop the scheduled continuation.
    Cancel,
    /// Replace the scheduled continuation.
    Schedule(Continuation, Duration),
}

/// The result of one engine operation.
#[derive(Debug, Default, PartialEq)]
pub struct Step {
    pub events: Vec<Outbound>,
    pub timer: TimerDirective,
}

impl Step {
    fn events(events: Vec<Outbound>) -> Self {
        Self { events, timer: TimerDirective::Keep }
    }

    /// Appends `next`; its timer directive wins unless it is `Keep`.
    fn then(mut self, next: Step) -> Self {
        self.events.extend(next.events);
        if next.timer != TimerDirective::Keep {
            self.timer = next.timer;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.timer == TimerDirective::Keep
    }
}

/// Where the current round is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No game running.
    Idle,
    /// A roll is scheduled; players may bank.
    AwaitingRoll,
    /// The round busted; waiting out the grace period.
    Resolving,
}

/// Per-room game state.
#[derive(Debug)]
pub struct RoundEngine {
    max_rounds: u32,
    roll_delay: Duration,
    bust_grace: Duration,

    state: RoomState,
    phase: RoundPhase,
    leaderboard: Leaderboard,
    powerups: HashMap<String, PowerupSlots>,

    current_round: u32,
    round_total: u64,
    roll_count: u32,
    banked: HashSet<String>,
    snake_eyes_this_round: bool,
}

impl RoundEngine {
    pub fn new(max_rounds: u32, config: &RoomConfig) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            roll_delay: config.roll_delay,
            bust_grace: config.bust_grace,
            state: RoomState::Waiting,
            phase: RoundPhase::Idle,
            leaderboard: Leaderboard::new(),
            powerups: HashMap::new(),
            current_round: 0,
            round_total: 0,
            roll_count: 0,
            banked: HashSet::new(),
            snake_eyes_this_round: false,
        }
    }

    // -- accessors ---------------------------------------------------------

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn round_total(&self) -> u64 {
        self.round_total
    }

    pub fn roll_count(&self) -> u32 {
        self.roll_count
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn player_count(&self) -> usize {
        self.leaderboard.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.leaderboard.contains(name)
    }

    pub fn is_banked(&self, name: &str) -> bool {
        self.banked.contains(name)
    }

    pub fn powerups(&self, name: &str) -> Option<&PowerupSlots> {
        self.powerups.get(name)
    }

    // -- membership --------------------------------------------------------

    /// Adds a player. Returns the stored (trimmed) name.
    ///
    /// # Errors
    /// `EmptyName` or `NameTaken`.
    pub fn join(&mut self, name: &str) -> Result<(String, Step), RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::EmptyName);
        }
        if !self.leaderboard.insert(name) {
            return Err(RoomError::NameTaken(name.to_owned()));
        }
        self.powerups.insert(name.to_owned(), PowerupSlots::default());
        Ok((name.to_owned(), Step::events(self.membership_events())))
    }

    /// Removes a player. Their share of the pot and any active power-ups
    /// go with them; the round carries on.
    pub fn leave(&mut self, name: &str) -> Step {
        if self.leaderboard.remove(name).is_none() {
            return Step::default();
        }
        self.powerups.remove(name);
        self.banked.remove(name);
        Step::events(self.membership_events())
    }

    fn membership_events(&self) -> Vec<Outbound> {
        vec![
            (Recipient::All, ServerEvent::LobbyUpdate { players: self.leaderboard.names() }),
            self.leaderboard_update(),
        ]
    }

    fn leaderboard_update(&self) -> Outbound {
        (
            Recipient::All,
            ServerEvent::LeaderboardUpdate { leaderboard: self.leaderboard.snapshot() },
        )
    }

    // -- game lifecycle ----------------------------------------------------

    /// Starts a fresh game: zeroes scores, resets power-ups, and opens
    /// round 1. The caller has already checked that it came from the host.
    ///
    /// # Errors
    /// `AlreadyStarted` while a game is running.
    pub fn start_game(&mut self) -> Result<Step, RoomError> {
        if self.state.is_playing() {
            return Err(RoomError::AlreadyStarted);
        }
        self.leaderboard.reset_scores();
        for slots in self.powerups.values_mut() {
            *slots = PowerupSlots::default();
        }
        self.state = RoomState::Playing;
        self.current_round = 1;

        let step = Step::events(vec![
            (
                Recipient::All,
                ServerEvent::GameStart {
                    players: self.leaderboard.names(),
                    max_rounds: self.max_rounds,
                },
            ),
            self.leaderboard_update(),
        ]);
        Ok(step.then(self.start_round()))
    }

    fn start_round(&mut self) -> Step {
        self.round_total = 0;
        self.roll_count = 0;
        self.banked.clear();
        self.snake_eyes_this_round = false;
        for slots in self.powerups.values_mut() {
            slots.streak_bonus.survived = 0;
        }
        self.phase = RoundPhase::AwaitingRoll;

        Step {
            events: vec![(
                Recipient::All,
                ServerEvent::RoundUpdate { round: self.current_round, max_rounds: self.max_rounds },
            )],
            timer: TimerDirective::Schedule(Continuation::Roll, self.roll_delay),
        }
    }

    fn advance_round(&mut self) -> Step {
        self.current_round += 1;
        if self.current_round > self.max_rounds {
            self.finish_game()
        } else {
            self.start_round()
        }
    }

    fn finish_game(&mut self) -> Step {
        self.state = RoomState::Waiting;
        self.phase = RoundPhase::Idle;
        self.current_round = self.max_rounds;

        let leaderboard = self.leaderboard.snapshot();
        let top_players = self.leaderboard.top(TOP_PLAYERS);

        let mut events: Vec<Outbound> = self
            .leaderboard
            .iter()
            .map(|(name, _)| {
                (
                    Recipient::Player(name.to_owned()),
                    ServerEvent::GameOver {
                        leaderboard: leaderboard.clone(),
                        top_players: top_players.clone(),
                        your_placement: self.leaderboard.placement(name),
                    },
                )
            })
            .collect();
        events.push((
            Recipient::Observers,
            ServerEvent::GameOver { leaderboard, top_players, your_placement: None },
        ));

        Step { events, timer: TimerDirective::Cancel }
    }

    /// Vacuously true for an empty room.
    fn all_banked(&self) -> bool {
        self.leaderboard.iter().all(|(name, _)| self.banked.contains(name))
    }

    /// Ends the round before a bust: settles snake eyes and moves on.
    fn end_round_early(&mut self) -> Step {
        let mut results = Vec::new();
        let changed = self.settle_snake_eyes(&mut results);
        if changed {
            results.push(self.leaderboard_update());
        }
        Step::events(results).then(self.advance_round())
    }

    // -- player actions ----------------------------------------------------

    /// Claims the current pot for `name`. Ignored for unknown or
    /// already-banked players, outside a game, and during a bust pause.
    pub fn bank(&mut self, name: &str) -> Step {
        if self.phase != RoundPhase::AwaitingRoll
            || !self.leaderboard.contains(name)
            || self.banked.contains(name)
        {
            return Step::default();
        }
        self.banked.insert(name.to_owned());
        let new_score = self.leaderboard.credit(name, self.round_total).unwrap_or_default();

        let step = Step::events(vec![
            (Recipient::All, ServerEvent::Banked { name: name.to_owned(), new_score }),
            self.leaderboard_update(),
        ]);
        if self.all_banked() {
            step.then(self.end_round_early())
        } else {
            step
        }
    }

    /// Activates a power-up by wire name. Non-players are ignored.
    ///
    /// # Errors
    /// `InvalidPowerup`, `PowerupAlreadyActive`, `PowerupAlreadyUsed`, or
    /// `InsufficientCover`.
    pub fn use_powerup(&mut self, name: &str, powerup: &str) -> Result<Step, RoomError> {
        let Some(score) = self.leaderboard.get(name) else {
            return Ok(Step::default());
        };
        let kind = PowerupKind::from_name(powerup)
            .ok_or_else(|| RoomError::InvalidPowerup(powerup.to_owned()))?;
        let slots = self.powerups.entry(name.to_owned()).or_default();
        slots.activate(kind, score)?;

        Ok(Step::events(vec![
            (Recipient::Player(name.to_owned()), ServerEvent::PowerupActivated { name: kind }),
            (Recipient::All, ServerEvent::PowerupUsed { player: name.to_owned(), name: kind }),
        ]))
    }

    // -- timer -------------------------------------------------------------

    /// Runs a fired continuation. Continuations that no longer match the
    /// phase are stale and do nothing.
    pub fn on_timer(&mut self, continuation: Continuation, dice: &mut dyn DiceSource) -> Step {
        match (continuation, self.phase) {
            (Continuation::Roll, RoundPhase::AwaitingRoll) => self.roll(dice),
            (Continuation::AdvanceRound, RoundPhase::Resolving) => self.advance_round(),
            _ => Step::default(),
        }
    }

    fn roll(&mut self, dice: &mut dyn DiceSource) -> Step {
        if self.all_banked() {
            return self.end_round_early();
        }

        let pair = DicePair::roll(dice);
        self.roll_count += 1;
        if pair.is_snake_eyes() {
            self.snake_eyes_this_round = true;
        }

        let mut results = Vec::new();
        let mut changed = self.step_streaks(pair, &mut results);

        let scored = score_roll(self.roll_count, pair, self.round_total);
        self.round_total = scored.pot;
        let roll_event = (
            Recipient::All,
            ServerEvent::Roll {
                d1: pair.d1,
                d2: pair.d2,
                sum: pair.sum(),
                pot: scored.pot,
                message: scored.message,
            },
        );

        if scored.bust {
            changed |= !self.settle_double_or_nothing(pair, &mut results).is_empty();
            changed |= self.settle_snake_eyes(&mut results);
            self.phase = RoundPhase::Resolving;

            let mut events = vec![roll_event];
            events.extend(results);
            if changed {
                events.push(self.leaderboard_update());
            }
            return Step {
                events,
                timer: TimerDirective::Schedule(Continuation::AdvanceRound, self.bust_grace),
            };
        }

        let owners = self.settle_double_or_nothing(pair, &mut results);
        changed |= !owners.is_empty();

        let mut events = vec![roll_event];
        events.extend(results);
        for owner in owners {
            if self.banked.insert(owner.clone()) {
                let new_score = self.leaderboard.get(&owner).unwrap_or_default();
                events.push((Recipient::All, ServerEvent::Banked { name: owner, new_score }));
            }
        }
        if changed {
            events.push(self.leaderboard_update());
        }

        let step = Step::events(events);
        if self.all_banked() {
            step.then(self.end_round_early())
        } else {
            step.then(Step {
                events: Vec::new(),
                timer: TimerDirective::Schedule(Continuation::Roll, self.roll_delay),
            })
        }
    }

    // -- power-up resolution -----------------------------------------------

    fn settle(&mut self, name: &str, resolution: Resolution, out: &mut Vec<Outbound>) -> bool {
        self.leaderboard.set(name, resolution.new_score);
        out.push((Recipient::Player(name.to_owned()), resolution.to_event()));
        resolution.points != 0
    }

    fn step_streaks(&mut self, pair: DicePair, out: &mut Vec<Outbound>) -> bool {
        let mut changed = false;
        for name in self.leaderboard.names() {
            let score = self.leaderboard.get(&name).unwrap_or_default();
            let resolution = self
                .powerups
                .get_mut(&name)
                .and_then(|slots| step_streak(&mut slots.streak_bonus, pair, score));
            if let Some(resolution) = resolution {
                changed |= self.settle(&name, resolution, out);
            }
        }
        changed
    }

    /// Returns the owners whose double-or-nothing resolved.
    fn settle_double_or_nothing(&mut self, pair: DicePair, out: &mut Vec<Outbound>) -> Vec<String> {
        let mut owners = Vec::new();
        for name in self.leaderboard.names() {
            let score = self.leaderboard.get(&name).unwrap_or_default();
            let resolution = self
                .powerups
                .get_mut(&name)
                .filter(|slots| slots.double_or_nothing.active)
                .map(|slots| resolve_double_or_nothing(&mut slots.double_or_nothing, pair, score));
            if let Some(resolution) = resolution {
                self.settle(&name, resolution, out);
                owners.push(name);
            }
        }
        owners
    }

    fn settle_snake_eyes(&mut self, out: &mut Vec<Outbound>) -> bool {
        let seen = self.snake_eyes_this_round;
        let mut changed = false;
        for name in self.leaderboard.names() {
            let score = self.leaderboard.get(&name).unwrap_or_default();
            let resolution = self
                .powerups
                .get_mut(&name)
                .filter(|slots| slots.snake_eyes.active)
                .map(|slots| resolve_snake_eyes(&mut slots.snake_eyes, seen, score));
            if let Some(resolution) = resolution {
                changed |= self.settle(&name, resolution, out);
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use rollhouse_protocol::{Placement, Scoreboard};

    use super::*;
    use crate::dice::ScriptedDice;

    fn config() -> RoomConfig {
        RoomConfig {
            roll_delay: Duration::from_secs(5),
            bust_grace: Duration::from_secs(5),
            ..RoomConfig::default()
        }
    }

    fn engine_with(players: &[&str], max_rounds: u32) -> RoundEngine {
        let mut engine = RoundEngine::new(max_rounds, &config());
        for name in players {
            engine.join(name).unwrap();
        }
        engine
    }

    fn started(players: &[&str], max_rounds: u32) -> RoundEngine {
        let mut engine = engine_with(players, max_rounds);
        engine.start_game().unwrap();
        engine
    }

    fn roll(engine: &mut RoundEngine, d1: u8, d2: u8) -> Step {
        engine.on_timer(Continuation::Roll, &mut ScriptedDice::new([(d1, d2)]))
    }

    fn set_score(engine: &mut RoundEngine, name: &str, score: u64) {
        engine.leaderboard.set(name, score);
    }

    fn event_types(step: &Step) -> Vec<&'static str> {
        step.events
            .iter()
            .map(|(_, e)| match e {
                ServerEvent::RoomCreated { .. } => "room_created",
                ServerEvent::Error { .. } => "error",
                ServerEvent::LobbyUpdate { .. } => "lobby_update",
                ServerEvent::LeaderboardUpdate { .. } => "leaderboard_update",
                ServerEvent::GameStart { .. } => "game_start",
                ServerEvent::RoundUpdate { .. } => "round_update",
                ServerEvent::RollScheduled { .. } => "roll_scheduled",
                ServerEvent::Roll { .. } => "roll",
                ServerEvent::Banked { .. } => "banked",
                ServerEvent::PowerupActivated { .. } => "powerup_activated",
                ServerEvent::PowerupUsed { .. } => "powerup_used",
                ServerEvent::PowerupResult { .. } => "powerup_result",
                ServerEvent::GameOver { .. } => "game_over",
            })
            .collect()
    }

    const ROLL_AGAIN: TimerDirective =
        TimerDirective::Schedule(Continuation::Roll, Duration::from_secs(5));
    const GRACE: TimerDirective =
        TimerDirective::Schedule(Continuation::AdvanceRound, Duration::from_secs(5));

    // -- membership --------------------------------------------------------

    #[test]
    fn test_join_trims_and_broadcasts() {
        let mut engine = RoundEngine::new(2, &config());
        let (name, step) = engine.join("  Ann ").unwrap();
        assert_eq!(name, "Ann");
        assert_eq!(event_types(&step), vec!["lobby_update", "leaderboard_update"]);
        assert_eq!(
            step.events[0].1,
            ServerEvent::LobbyUpdate { players: vec!["Ann".into()] }
        );
        assert_eq!(engine.leaderboard().get("Ann"), Some(0));
        assert_eq!(step.timer, TimerDirective::Keep);
    }

    #[test]
    fn test_join_rejects_empty_and_taken_names() {
        let mut engine = engine_with(&["Ann"], 2);
        assert_eq!(engine.join("   ").unwrap_err(), RoomError::EmptyName);
        assert_eq!(engine.join("Ann").unwrap_err(), RoomError::NameTaken("Ann".into()));
        assert!(engine.join("ann").is_ok(), "names are case-sensitive");
    }

    #[test]
    fn test_leave_removes_everything() {
        let mut engine = started(&["Ann", "Bo"], 2);
        engine.bank("Ann");
        let step = engine.leave("Ann");
        assert_eq!(event_types(&step), vec!["lobby_update", "leaderboard_update"]);
        assert!(!engine.contains("Ann"));
        assert!(engine.powerups("Ann").is_none());
        assert!(!engine.is_banked("Ann"));
        assert!(engine.leave("Ann").is_empty());
    }

    // -- game start --------------------------------------------------------

    #[test]
    fn test_start_game_opens_round_one() {
        let mut engine = engine_with(&["Ann", "Bo"], 2);
        let step = engine.start_game().unwrap();
        assert_eq!(
            event_types(&step),
            vec!["game_start", "leaderboard_update", "round_update"]
        );
        assert_eq!(
            step.events[0].1,
            ServerEvent::GameStart { players: vec!["Ann".into(), "Bo".into()], max_rounds: 2 }
        );
        assert_eq!(step.events[2].1, ServerEvent::RoundUpdate { round: 1, max_rounds: 2 });
        assert_eq!(step.timer, ROLL_AGAIN);
        assert_eq!(engine.state(), RoomState::Playing);
        assert_eq!(engine.phase(), RoundPhase::AwaitingRoll);
    }

    #[test]
    fn test_start_game_twice_fails() {
        let mut engine = started(&["Ann"], 2);
        assert_eq!(engine.start_game().unwrap_err(), RoomError::AlreadyStarted);
    }

    #[test]
    fn test_start_game_resets_scores_and_powerups() {
        let mut engine = engine_with(&["Ann"], 1);
        set_score(&mut engine, "Ann", 500);
        engine.use_powerup("Ann", "snake_eyes").unwrap();
        engine.start_game().unwrap();
        assert_eq!(engine.leaderboard().get("Ann"), Some(0));
        assert_eq!(engine.powerups("Ann"), Some(&PowerupSlots::default()));
    }

    // -- rolling and banking -----------------------------------------------

    #[test]
    fn test_scenario_bank_after_late_double() {
        let mut engine = started(&["Ann", "Bo"], 2);
        roll(&mut engine, 2, 3);
        roll(&mut engine, 6, 2);
        let step = roll(&mut engine, 5, 3);
        assert_eq!(engine.round_total(), 21);
        assert_eq!(step.timer, ROLL_AGAIN);

        let step = roll(&mut engine, 4, 4);
        assert_eq!(engine.round_total(), 42);
        assert!(matches!(step.events[0].1, ServerEvent::Roll { pot: 42, .. }));

        let step = engine.bank("Ann");
        assert_eq!(event_types(&step), vec!["banked", "leaderboard_update"]);
        assert_eq!(
            step.events[0].1,
            ServerEvent::Banked { name: "Ann".into(), new_score: 42 }
        );
        assert_eq!(
            step.events[1].1,
            ServerEvent::LeaderboardUpdate {
                leaderboard: Scoreboard(vec![("Ann".into(), 42), ("Bo".into(), 0)])
            }
        );
        assert_eq!(step.timer, TimerDirective::Keep, "Bo is still in, the roll stays scheduled");
    }

    #[test]
    fn test_bank_is_idempotent() {
        let mut engine = started(&["Ann", "Bo"], 2);
        roll(&mut engine, 2, 3);
        assert!(!engine.bank("Ann").is_empty());
        assert!(engine.bank("Ann").is_empty());
        assert_eq!(engine.leaderboard().get("Ann"), Some(5));
    }

    #[test]
    fn test_bank_ignored_for_unknown_player_and_outside_game() {
        let mut engine = engine_with(&["Ann"], 2);
        assert!(engine.bank("Ann").is_empty(), "waiting room");
        engine.start_game().unwrap();
        assert!(engine.bank("Zed").is_empty());
    }

    #[test]
    fn test_all_banked_ends_round_immediately() {
        let mut engine = started(&["Ann", "Bo"], 3);
        roll(&mut engine, 2, 3);
        engine.bank("Ann");
        let step = engine.bank("Bo");
        assert_eq!(
            event_types(&step),
            vec!["banked", "leaderboard_update", "round_update"]
        );
        assert_eq!(step.events[2].1, ServerEvent::RoundUpdate { round: 2, max_rounds: 3 });
        assert_eq!(step.timer, ROLL_AGAIN, "replaces the pending roll");
        assert_eq!(engine.round_total(), 0);
        assert!(!engine.is_banked("Ann"));
    }

    #[test]
    fn test_all_banked_in_last_round_ends_game() {
        let mut engine = started(&["Ann"], 1);
        roll(&mut engine, 6, 5);
        let step = engine.bank("Ann");
        assert_eq!(event_types(&step), vec!["banked", "leaderboard_update", "game_over", "game_over"]);
        assert_eq!(step.timer, TimerDirective::Cancel);
        assert_eq!(engine.state(), RoomState::Waiting);
    }

    #[test]
    fn test_roll_with_nobody_left_skips_to_next_round() {
        let mut engine = started(&[], 2);
        let step = roll(&mut engine, 3, 3);
        assert_eq!(event_types(&step), vec!["round_update"]);
        assert_eq!(engine.current_round(), 2);
    }

    #[test]
    fn test_late_seven_busts_and_waits_out_grace() {
        let mut engine = started(&["Ann"], 2);
        for (d1, d2) in [(2, 3), (2, 3), (2, 3)] {
            roll(&mut engine, d1, d2);
        }
        let step = roll(&mut engine, 3, 4);
        assert_eq!(event_types(&step), vec!["roll"]);
        assert!(matches!(step.events[0].1, ServerEvent::Roll { pot: 0, sum: 7, .. }));
        assert_eq!(step.timer, GRACE);
        assert_eq!(engine.phase(), RoundPhase::Resolving);

        assert!(engine.bank("Ann").is_empty(), "no banking during the pause");
        assert!(roll(&mut engine, 1, 1).is_empty(), "stale roll");

        let step = engine.on_timer(Continuation::AdvanceRound, &mut ScriptedDice::default());
        assert_eq!(event_types(&step), vec!["round_update"]);
        assert_eq!(engine.current_round(), 2);
        assert_eq!(engine.phase(), RoundPhase::AwaitingRoll);
    }

    #[test]
    fn test_early_seven_is_a_bonus() {
        let mut engine = started(&["Ann"], 2);
        let step = roll(&mut engine, 3, 4);
        assert_eq!(engine.round_total(), 70);
        assert_eq!(step.timer, ROLL_AGAIN);
    }

    // -- power-ups -----------------------------------------------------------

    #[test]
    fn test_use_powerup_events() {
        let mut engine = started(&["Ann", "Bo"], 2);
        set_score(&mut engine, "Ann", 100);
        let step = engine.use_powerup("Ann", "snake_eyes").unwrap();
        assert_eq!(
            step.events,
            vec![
                (
                    Recipient::Player("Ann".into()),
                    ServerEvent::PowerupActivated { name: PowerupKind::SnakeEyes }
                ),
                (
                    Recipient::All,
                    ServerEvent::PowerupUsed { player: "Ann".into(), name: PowerupKind::SnakeEyes }
                ),
            ]
        );
    }

    #[test]
    fn test_use_powerup_errors() {
        let mut engine = started(&["Ann"], 2);
        set_score(&mut engine, "Ann", 250);
        assert_eq!(
            engine.use_powerup("Ann", "streak_bonus").unwrap_err(),
            RoomError::InsufficientCover {
                kind: PowerupKind::StreakBonus,
                required: 300,
                score: 250
            }
        );
        assert_eq!(engine.powerups("Ann"), Some(&PowerupSlots::default()));
        assert_eq!(engine.leaderboard().get("Ann"), Some(250));
        assert_eq!(
            engine.use_powerup("Ann", "lucky_charm").unwrap_err(),
            RoomError::InvalidPowerup("lucky_charm".into())
        );
        assert!(engine.use_powerup("Zed", "snake_eyes").unwrap().is_empty());
    }

    #[test]
    fn test_double_or_nothing_force_banks_on_next_roll() {
        let mut engine = started(&["Ann", "Bo"], 2);
        set_score(&mut engine, "Ann", 50);
        engine.use_powerup("Ann", "double_or_nothing").unwrap();

        let step = roll(&mut engine, 2, 5);
        assert_eq!(
            event_types(&step),
            vec!["roll", "powerup_result", "banked", "leaderboard_update"]
        );
        assert_eq!(
            step.events[2].1,
            ServerEvent::Banked { name: "Ann".into(), new_score: 100 }
        );
        assert!(engine.is_banked("Ann"));
        assert_eq!(engine.round_total(), 70, "forced bank takes no pot");
        assert_eq!(step.timer, ROLL_AGAIN);
        assert!(!engine.powerups("Ann").unwrap().double_or_nothing.active);
    }

    #[test]
    fn test_double_or_nothing_miss_zeroes_score() {
        let mut engine = started(&["Ann"], 2);
        set_score(&mut engine, "Ann", 80);
        engine.use_powerup("Ann", "double_or_nothing").unwrap();
        let step = roll(&mut engine, 6, 6);
        assert_eq!(engine.leaderboard().get("Ann"), Some(0));
        assert!(matches!(
            step.events[1],
            (Recipient::Player(_), ServerEvent::PowerupResult { points: -80, .. })
        ));
        // Ann was the only player: the force-bank ends the round.
        assert!(event_types(&step).contains(&"round_update"));
        assert_eq!(engine.current_round(), 2);
    }

    #[test]
    fn test_double_or_nothing_resolves_on_bust() {
        let mut engine = started(&["Ann", "Bo"], 2);
        for _ in 0..3 {
            roll(&mut engine, 2, 3);
        }
        set_score(&mut engine, "Ann", 40);
        engine.use_powerup("Ann", "double_or_nothing").unwrap();
        let step = roll(&mut engine, 4, 3);
        assert_eq!(event_types(&step), vec!["roll", "powerup_result", "leaderboard_update"]);
        assert_eq!(engine.leaderboard().get("Ann"), Some(80));
        assert_eq!(step.timer, GRACE);
    }

    #[test]
    fn test_streak_bonus_pays_once_after_three_rolls() {
        let mut engine = started(&["Ann", "Bo"], 2);
        set_score(&mut engine, "Ann", 300);
        engine.use_powerup("Ann", "streak_bonus").unwrap();
        roll(&mut engine, 2, 3);
        roll(&mut engine, 2, 2);
        let step = roll(&mut engine, 6, 5);
        assert_eq!(event_types(&step), vec!["roll", "powerup_result", "leaderboard_update"]);
        assert_eq!(engine.leaderboard().get("Ann"), Some(600));
        let step = roll(&mut engine, 6, 5);
        assert_eq!(event_types(&step), vec!["roll"]);
    }

    #[test]
    fn test_streak_bonus_breaks_on_early_seven() {
        let mut engine = started(&["Ann"], 2);
        set_score(&mut engine, "Ann", 310);
        engine.use_powerup("Ann", "streak_bonus").unwrap();
        roll(&mut engine, 3, 4);
        assert_eq!(engine.leaderboard().get("Ann"), Some(10));
        assert!(!engine.powerups("Ann").unwrap().streak_bonus.slot.active);
        assert_eq!(engine.round_total(), 70);
    }

    #[test]
    fn test_snake_eyes_settles_on_early_round_end() {
        let mut engine = started(&["Ann"], 3);
        set_score(&mut engine, "Ann", 100);
        engine.use_powerup("Ann", "snake_eyes").unwrap();
        roll(&mut engine, 1, 1);
        let step = engine.bank("Ann");
        assert_eq!(
            event_types(&step),
            vec!["banked", "leaderboard_update", "powerup_result", "leaderboard_update", "round_update"]
        );
        assert_eq!(engine.leaderboard().get("Ann"), Some(202));
    }

    #[test]
    fn test_snake_eyes_loses_on_bust_without_snake_eyes() {
        let mut engine = started(&["Ann"], 3);
        set_score(&mut engine, "Ann", 150);
        engine.use_powerup("Ann", "snake_eyes").unwrap();
        for _ in 0..3 {
            roll(&mut engine, 2, 3);
        }
        roll(&mut engine, 1, 6);
        assert_eq!(engine.leaderboard().get("Ann"), Some(50));
        assert!(!engine.powerups("Ann").unwrap().snake_eyes.active);
    }

    // -- game over -----------------------------------------------------------

    #[test]
    fn test_game_over_ranks_and_addresses_each_player() {
        let mut engine = started(&["Ann", "Bo", "Cy", "Di"], 1);
        for (name, score) in [("Ann", 50), ("Bo", 50), ("Cy", 50), ("Di", 90)] {
            set_score(&mut engine, name, score);
        }
        let step = engine.finish_game();
        assert_eq!(step.events.len(), 5);

        let (to, event) = &step.events[0];
        assert_eq!(to, &Recipient::Player("Ann".into()));
        let ServerEvent::GameOver { top_players, your_placement, .. } = event else {
            panic!("expected game_over, got {event:?}");
        };
        let names: Vec<_> = top_players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Di", "Ann", "Bo"]);
        assert_eq!(*your_placement, Some(Placement { rank: 2, score: 50 }));

        assert!(matches!(
            &step.events[4],
            (Recipient::Observers, ServerEvent::GameOver { your_placement: None, .. })
        ));
    }

    #[test]
    fn test_game_runs_to_completion_and_can_restart() {
        let mut engine = started(&["Ann"], 2);
        let mut dice = ScriptedDice::new([(1, 2)]);
        // Round 1: bank; round 2: bank again.
        engine.on_timer(Continuation::Roll, &mut dice);
        engine.bank("Ann");
        assert_eq!(engine.current_round(), 2);
        engine.on_timer(Continuation::Roll, &mut dice);
        let step = engine.bank("Ann");
        assert!(event_types(&step).contains(&"game_over"));
        assert_eq!(engine.leaderboard().get("Ann"), Some(6));
        assert_eq!(engine.phase(), RoundPhase::Idle);

        let step = engine.start_game().unwrap();
        assert_eq!(step.timer, ROLL_AGAIN);
        assert_eq!(engine.leaderboard().get("Ann"), Some(0));
    }
}
