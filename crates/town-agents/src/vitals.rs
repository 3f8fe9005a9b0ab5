//! Energy and hunger, and the moods they imply.
//!
//! Both values live in `[0, 100]`. Every tick hunger creeps up and energy
//! drains regardless of what the agent decides; resting and eating push
//! them back.

use rust_decimal::Decimal;

use crate::config::VitalsConfig;

/// Upper bound for both vitals.
pub const VITAL_MAX: Decimal = Decimal::ONE_HUNDRED;

/// Mood shown when an agent is worn out.
pub const MOOD_EXHAUSTED: &str = "exhausted";

/// Mood shown when an agent badly needs food.
pub const MOOD_HUNGRY: &str = "hungry";

/// Mood after a satisfying rest or meal.
pub const MOOD_CONTENT: &str = "content";

/// An agent's physical state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vitals {
    /// Energy in `[0, 100]`.
    pub energy: Decimal,
    /// Hunger in `[0, 100]`.
    pub hunger: Decimal,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            energy: VITAL_MAX,
            hunger: Decimal::ZERO,
        }
    }
}

impl Vitals {
    /// Apply one tick of passive metabolism.
    pub fn drift(&mut self, config: &VitalsConfig) {
        self.hunger = self.hunger.saturating_add(config.hunger_per_tick).min(VITAL_MAX);
        self.energy = self
            .energy
            .saturating_sub(config.energy_decay_per_tick)
            .max(Decimal::ZERO);
    }

    /// Recover energy.
    pub fn rest(&mut self, config: &VitalsConfig) {
        self.energy = self.energy.saturating_add(config.rest_energy_gain).min(VITAL_MAX);
    }

    /// Relieve hunger.
    pub fn eat(&mut self, config: &VitalsConfig) {
        self.hunger = self
            .hunger
            .saturating_sub(config.eat_hunger_relief)
            .max(Decimal::ZERO);
    }

    /// The mood forced by bodily needs, if any. Exhaustion wins over hunger.
    pub fn pressing_mood(&self, config: &VitalsConfig) -> Option<&'static str> {
        if self.energy < config.exhausted_below {
            Some(MOOD_EXHAUSTED)
        } else if self.hunger > config.hungry_above {
            Some(MOOD_HUNGRY)
        } else {
            None
        }
    }
}
