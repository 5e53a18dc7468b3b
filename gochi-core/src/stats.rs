//! Pet stats, decay math, and mood classification.
//!
//! Everything in this module is pure: given a snapshot, a clock reading and
//! the configured rates, it computes the next snapshot. The engine wraps
//! these functions in its lock and persistence cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest value any stat can take.
pub const MIN_STAT: u8 = 0;

/// Highest value any stat can take.
pub const MAX_STAT: u8 = 100;

/// Hunger of a freshly adopted pet.
pub const DEFAULT_HUNGER: u8 = 80;

/// Energy of a freshly adopted pet.
pub const DEFAULT_ENERGY: u8 = 75;

/// Affection of a freshly adopted pet.
pub const DEFAULT_AFFECTION: u8 = 70;

const FEED_BOOST: i64 = 30;
const TREAT_BOOST: i64 = 20;
const TREAT_HUNGER_COST: i64 = 5;
const SLEEP_BOOST: i64 = 40;
const AFFECTION_SIDE_BOOST: i64 = 5;

const SAD_HUNGER_BELOW: u8 = 30;
const SAD_ENERGY_BELOW: u8 = 25;
const GOLDEN_AFFECTION_ABOVE: u8 = 75;
const GOLDEN_ENERGY_ABOVE: u8 = 60;
const GOLDEN_HUNGER_ABOVE: u8 = 60;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Clamp an arbitrary stat value into `[MIN_STAT, MAX_STAT]`.
pub fn clamp_stat(value: i64) -> u8 {
    value.clamp(MIN_STAT as i64, MAX_STAT as i64) as u8
}

/// A snapshot of the pet's stat vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetStats {
    /// How well fed the pet is (100 = full).
    pub hunger: u8,
    /// How rested the pet is.
    pub energy: u8,
    /// How loved the pet feels.
    pub affection: u8,
    /// When decay was last applied.
    pub last_updated: DateTime<Utc>,
}

impl PetStats {
    /// Stats for a pet with no saved history.
    pub fn new_default(now: DateTime<Utc>) -> Self {
        Self {
            hunger: DEFAULT_HUNGER,
            energy: DEFAULT_ENERGY,
            affection: DEFAULT_AFFECTION,
            last_updated: now,
        }
    }

    /// Build a snapshot from raw values, clamping each stat into range.
    pub fn clamped(hunger: i64, energy: i64, affection: i64, last_updated: DateTime<Utc>) -> Self {
        Self {
            hunger: clamp_stat(hunger),
            energy: clamp_stat(energy),
            affection: clamp_stat(affection),
            last_updated,
        }
    }

    /// Classify the current mood.
    pub fn mood(&self) -> Mood {
        Mood::classify(self)
    }

    /// Add a (possibly negative) delta to every stat, clamping the result.
    ///
    /// Does not touch `last_updated`.
    pub fn apply_delta(&mut self, delta: StatDelta) {
        self.hunger = clamp_stat(self.hunger as i64 + delta.hunger);
        self.energy = clamp_stat(self.energy as i64 + delta.energy);
        self.affection = clamp_stat(self.affection as i64 + delta.affection);
    }

    /// Apply time-proportional decay up to `now`.
    ///
    /// Returns `true` if any stat changed. A `now` at or before
    /// `last_updated` is a no-op, so the timestamp never moves backward.
    pub fn decay(
        &mut self,
        now: DateTime<Utc>,
        rates: &DecayRates,
        policy: DecayPolicy,
        carry: &mut DecayCarry,
    ) -> bool {
        let elapsed = now.signed_duration_since(self.last_updated);
        if elapsed <= chrono::Duration::zero() {
            return false;
        }
        let minutes = elapsed.num_milliseconds() as f64 / MILLIS_PER_MINUTE;

        let before = (self.hunger, self.energy, self.affection);
        self.hunger = decay_stat(self.hunger, minutes * rates.hunger, &mut carry.hunger);
        self.energy = decay_stat(self.energy, minutes * rates.energy, &mut carry.energy);
        self.affection = decay_stat(
            self.affection,
            minutes * rates.affection,
            &mut carry.affection,
        );
        self.last_updated = now;

        if policy == DecayPolicy::AdvanceAlways {
            *carry = DecayCarry::default();
        }

        before != (self.hunger, self.energy, self.affection)
    }
}

fn decay_stat(value: u8, amount: f64, carry: &mut f64) -> u8 {
    let total = amount + *carry;
    let whole = total.floor();
    *carry = total - whole;
    clamp_stat((value as i64).saturating_sub(whole as i64))
}

/// Per-minute decay rate for each stat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayRates {
    /// Hunger points lost per minute.
    pub hunger: f64,
    /// Energy points lost per minute.
    pub energy: f64,
    /// Affection points lost per minute.
    pub affection: f64,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            hunger: 0.5,
            energy: 0.4,
            affection: 0.2,
        }
    }
}

/// How `last_updated` interacts with decay that has not yet reached a
/// whole point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecayPolicy {
    /// Drop any fractional decay each time the timestamp advances.
    ///
    /// Under polling faster than one point per interval, stats never decay.
    AdvanceAlways,
    /// Keep each stat's fractional decay in memory and add it to the next
    /// computation.
    #[default]
    CarryFraction,
}

impl fmt::Display for DecayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecayPolicy::AdvanceAlways => write!(f, "advance-always"),
            DecayPolicy::CarryFraction => write!(f, "carry-fraction"),
        }
    }
}

impl std::str::FromStr for DecayPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "advance-always" => Ok(DecayPolicy::AdvanceAlways),
            "carry-fraction" => Ok(DecayPolicy::CarryFraction),
            other => Err(crate::Error::config_error(format!(
                "unknown decay policy '{}'",
                other
            ))),
        }
    }
}

/// Fractional decay accrued per stat but not yet applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecayCarry {
    pub hunger: f64,
    pub energy: f64,
    pub affection: f64,
}

/// A signed change to each stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatDelta {
    pub hunger: i64,
    pub energy: i64,
    pub affection: i64,
}

/// Something the owner can do for the pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// A meal: fills hunger, a little affection.
    Feed,
    /// A treat: lots of affection, spoils appetite slightly.
    Treat,
    /// A nap: restores energy.
    Sleep,
}

impl Action {
    /// The stat change this action applies.
    pub fn delta(self) -> StatDelta {
        match self {
            Action::Feed => StatDelta {
                hunger: FEED_BOOST,
                energy: 0,
                affection: AFFECTION_SIDE_BOOST,
            },
            Action::Treat => StatDelta {
                hunger: -TREAT_HUNGER_COST,
                energy: 0,
                affection: TREAT_BOOST,
            },
            Action::Sleep => StatDelta {
                hunger: 0,
                energy: SLEEP_BOOST,
                affection: 0,
            },
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Feed => write!(f, "feed"),
            Action::Treat => write!(f, "treat"),
            Action::Sleep => write!(f, "sleep"),
        }
    }
}

/// The pet's mood, derived from its stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Hungry or exhausted.
    Sad,
    /// Everything is fine.
    Neutral,
    /// Well fed, rested and loved.
    Golden,
}

impl Mood {
    /// Classify a snapshot. Sad takes precedence over golden.
    pub fn classify(stats: &PetStats) -> Self {
        if stats.hunger < SAD_HUNGER_BELOW || stats.energy < SAD_ENERGY_BELOW {
            Mood::Sad
        } else if stats.affection > GOLDEN_AFFECTION_ABOVE
            && stats.energy > GOLDEN_ENERGY_ABOVE
            && stats.hunger > GOLDEN_HUNGER_ABOVE
        {
            Mood::Golden
        } else {
            Mood::Neutral
        }
    }

    /// The lowercase name used in the UI and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Sad => "sad",
            Mood::Neutral => "neutral",
            Mood::Golden => "golden",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
