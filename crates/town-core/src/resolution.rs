//! Applying decisions to the town.
//!
//! Resolution is synchronous and runs under the town write lock, so every
//! effect of a decision becomes visible at once. Moves are checked against
//! live positions; the first agent to claim a cell keeps it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use town_agents::VitalsConfig;
use town_agents::vitals::MOOD_CONTENT;
use town_types::{BuildingType, Conversation, MemoryEntry};
use tracing::debug;

use crate::command::Command;
use crate::decision::Decision;
use crate::town::Town;

/// Relationship gain for both sides of a conversation.
pub const RELATIONSHIP_STEP: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

const TALK_IMPORTANCE: Decimal = Decimal::from_parts(7, 0, 0, false, 1);
const REST_IMPORTANCE: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
const EAT_IMPORTANCE: Decimal = Decimal::from_parts(4, 0, 0, false, 1);
const DECISION_IMPORTANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// What a resolved decision did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A step toward a building was attempted.
    Moved {
        /// Type of the destination.
        destination: BuildingType,
        /// Whether the step succeeded.
        moved: bool,
    },
    /// No building of the requested type exists.
    NoDestination {
        /// The requested type.
        destination: BuildingType,
    },
    /// A conversation was recorded.
    Talked {
        /// Who was addressed.
        partner: String,
        /// What was said.
        message: String,
    },
    /// Nobody was close enough to talk to.
    NoPartner,
    /// Energy was restored at home.
    Rested,
    /// Rest was asked for away from a house.
    NotAtHome,
    /// Hunger was relieved.
    Ate,
    /// The plan matched no command.
    Idle,
}

/// Apply one decision. Returns `None` if the agent has disappeared.
pub fn resolve(
    town: &mut Town,
    decision: &Decision,
    now: DateTime<Utc>,
    vitals: &VitalsConfig,
) -> Option<Outcome> {
    let id = decision.agent_id;
    let position = town.map.position_of(id)?;
    town.agents.get_mut(&id)?.current_action.clone_from(&decision.plan);

    let outcome = match decision.command {
        Command::Move(destination) => {
            let target = town.map.nearest_building(position, destination).map(|b| b.origin);
            match target {
                Some(target) => {
                    let moved = town.map.attempt_move(id, target);
                    if let Some(agent) = town.agents.get_mut(&id) {
                        agent.current_action = format!("going to {destination}");
                    }
                    Outcome::Moved { destination, moved }
                }
                None => Outcome::NoDestination { destination },
            }
        }
        Command::Talk => talk(town, decision, position, now),
        Command::Rest => {
            let at_home = town
                .map
                .building_at(position)
                .is_some_and(|b| b.kind == BuildingType::House);
            let agent = town.agents.get_mut(&id)?;
            if at_home {
                agent.vitals.rest(vitals);
                agent.current_action = String::from("resting");
                MOOD_CONTENT.clone_into(&mut agent.mood);
                agent.remember(MemoryEntry::new("Rested at home", REST_IMPORTANCE, now).at(position));
                Outcome::Rested
            } else {
                Outcome::NotAtHome
            }
        }
        Command::Eat => {
            let agent = town.agents.get_mut(&id)?;
            agent.vitals.eat(vitals);
            agent.current_action = String::from("eating");
            MOOD_CONTENT.clone_into(&mut agent.mood);
            agent.remember(MemoryEntry::new("Ate some food", EAT_IMPORTANCE, now).at(position));
            Outcome::Ate
        }
        Command::Unknown => Outcome::Idle,
    };

    let agent = town.agents.get_mut(&id)?;
    agent.remember(MemoryEntry::new(
        format!("I decided to: {}", decision.plan),
        DECISION_IMPORTANCE,
        now,
    ));
    agent.last_decision_at = now;
    agent.refresh_mood(vitals);
    debug!(agent = %agent.name, ?outcome, "Decision resolved");
    Some(outcome)
}

fn talk(
    town: &mut Town,
    decision: &Decision,
    position: town_types::Position,
    now: DateTime<Utc>,
) -> Outcome {
    let Some(utterance) = decision.utterance.as_ref() else {
        return Outcome::NoPartner;
    };
    let speaker_id = decision.agent_id;
    let (Some(speaker), Some(listener)) =
        (town.name_of(speaker_id), town.name_of(utterance.partner))
    else {
        return Outcome::NoPartner;
    };

    let record = Conversation {
        speaker: speaker.to_owned(),
        speaker_id,
        listener: listener.to_owned(),
        listener_id: utterance.partner,
        message: utterance.message.clone(),
        timestamp: now,
        location: position,
    };
    town.conversations.push(record.clone());

    if let Some(listener) = town.agents.get_mut(&utterance.partner) {
        listener.conversations.push(record.clone());
        listener.relationships.strengthen(speaker_id, RELATIONSHIP_STEP);
    }
    if let Some(speaker) = town.agents.get_mut(&speaker_id) {
        speaker.relationships.strengthen(utterance.partner, RELATIONSHIP_STEP);
        speaker.remember(
            MemoryEntry::new(
                format!("Talked to {}: {}", record.listener, record.message),
                TALK_IMPORTANCE,
                now,
            )
            .at(position)
            .involving(utterance.partner),
        );
        speaker.current_action = format!("talking to {}", record.listener);
        speaker.conversations.push(record.clone());
    }

    Outcome::Talked {
        partner: record.listener,
        message: record.message,
    }
}
