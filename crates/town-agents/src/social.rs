//! Relationship scores between agents.
//!
//! Scores are unbounded and only ever grow by fixed increments when two
//! agents interact. A positive score reads as "friendly" in prompts.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use town_types::AgentId;

/// How one agent feels about every other agent it has met.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    scores: BTreeMap<AgentId, Decimal>,
}

impl Relationships {
    /// Create an empty relationship map.
    pub const fn new() -> Self {
        Self {
            scores: BTreeMap::new(),
        }
    }

    /// Current score toward `other`; zero for strangers.
    pub fn score(&self, other: AgentId) -> Decimal {
        self.scores.get(&other).copied().unwrap_or(Decimal::ZERO)
    }

    /// Whether the score toward `other` is positive.
    pub fn is_friendly(&self, other: AgentId) -> bool {
        self.score(other) > Decimal::ZERO
    }

    /// Add `amount` to the score toward `other`.
    pub fn strengthen(&mut self, other: AgentId, amount: Decimal) {
        let score = self.scores.entry(other).or_insert(Decimal::ZERO);
        *score = score.saturating_add(amount);
    }

    /// All known relationships.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, Decimal)> + '_ {
        self.scores.iter().map(|(id, score)| (*id, *score))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn strangers_are_neutral() {
        let rel = Relationships::new();
        let other = AgentId::new();
        assert_eq!(rel.score(other), Decimal::ZERO);
        assert!(!rel.is_friendly(other));
    }

    #[test]
    fn increments_are_exact() {
        let mut rel = Relationships::new();
        let other = AgentId::new();
        for _ in 0..3 {
            rel.strengthen(other, dec!(0.1));
        }
        assert_eq!(rel.score(other), dec!(0.3));
        assert!(rel.is_friendly(other));
        assert_eq!(rel.iter().count(), 1);
    }
}
