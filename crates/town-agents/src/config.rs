//! Tunables for agent vitals and memory.
//!
//! Both structs deserialize straight from the `vitals` and `memory`
//! sections of `town-config.yaml`; every field falls back to its default
//! when omitted.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Per-tick drift and per-action effects on energy and hunger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VitalsConfig {
    /// Hunger added every tick (default: 0.1).
    #[serde(default = "default_hunger_per_tick")]
    pub hunger_per_tick: Decimal,

    /// Energy lost every tick (default: 0.05).
    #[serde(default = "default_energy_decay_per_tick")]
    pub energy_decay_per_tick: Decimal,

    /// Energy regained by resting at home (default: 10).
    #[serde(default = "default_rest_energy_gain")]
    pub rest_energy_gain: Decimal,

    /// Hunger removed by eating (default: 20).
    #[serde(default = "default_eat_hunger_relief")]
    pub eat_hunger_relief: Decimal,

    /// Energy below which an agent feels exhausted (default: 20).
    #[serde(default = "default_exhausted_below")]
    pub exhausted_below: Decimal,

    /// Hunger above which an agent feels hungry (default: 80).
    #[serde(default = "default_hungry_above")]
    pub hungry_above: Decimal,
}

fn default_hunger_per_tick() -> Decimal {
    Decimal::new(1, 1)
}

fn default_energy_decay_per_tick() -> Decimal {
    Decimal::new(5, 2)
}

fn default_rest_energy_gain() -> Decimal {
    Decimal::from(10)
}

fn default_eat_hunger_relief() -> Decimal {
    Decimal::from(20)
}

fn default_exhausted_below() -> Decimal {
    Decimal::from(20)
}

fn default_hungry_above() -> Decimal {
    Decimal::from(80)
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            hunger_per_tick: default_hunger_per_tick(),
            energy_decay_per_tick: default_energy_decay_per_tick(),
            rest_energy_gain: default_rest_energy_gain(),
            eat_hunger_relief: default_eat_hunger_relief(),
            exhausted_below: default_exhausted_below(),
            hungry_above: default_hungry_above(),
        }
    }
}

/// Memory retention and retrieval limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Memories an agent keeps (default: 50).
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Memories retrieved per relevance query (default: 5).
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,

    /// Retrieved memories quoted in a planning prompt (default: 3).
    #[serde(default = "default_prompt_memories")]
    pub prompt_memories: usize,

    /// Retrieved memories quoted in a conversation prompt (default: 2).
    #[serde(default = "default_conversation_memories")]
    pub conversation_memories: usize,

    /// Conversations kept in each agent's private history (default: 100).
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

const fn default_capacity() -> usize {
    50
}

const fn default_retrieval_limit() -> usize {
    5
}

const fn default_prompt_memories() -> usize {
    3
}

const fn default_conversation_memories() -> usize {
    2
}

const fn default_history_capacity() -> usize {
    100
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            retrieval_limit: default_retrieval_limit(),
            prompt_memories: default_prompt_memories(),
            conversation_memories: default_conversation_memories(),
            history_capacity: default_history_capacity(),
        }
    }
}
