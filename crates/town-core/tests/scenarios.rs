//! End-to-end scenarios for the `town-core` simulation.
//!
//! Plans are forced or scripted so every run is deterministic apart from
//! spawn cells, which are asserted by range.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use rust_decimal_macros::dec;
use town_core::{NewAgent, Outcome, ScriptedModel, Simulation, SimulationConfig};
use town_types::{BuildingType, Position};
use town_world::BuildingSpec;

fn building(id: &str, kind: BuildingType, x: i32, y: i32, width: i32, height: i32) -> BuildingSpec {
    BuildingSpec {
        id: id.to_owned(),
        kind,
        x,
        y,
        width,
        height,
    }
}

fn config_with(buildings: Vec<BuildingSpec>) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.world.width = 50;
    config.world.height = 50;
    config.buildings = buildings;
    config
}

#[tokio::test]
async fn forced_move_takes_one_step_toward_the_cafe() {
    let config = config_with(vec![
        building("house1", BuildingType::House, 5, 5, 3, 3),
        building("cafe1", BuildingType::Cafe, 10, 15, 4, 3),
    ]);
    let sim = Simulation::new(&config, Arc::new(ScriptedModel::replying("rest"))).unwrap();
    let alice = sim
        .add_agent(NewAgent::new("Alice", "friendly and curious").at_home("house1"))
        .await
        .unwrap();

    let start = sim.agent(alice).await.unwrap().summary.position;
    assert!((5..8).contains(&start.x), "x = {}", start.x);
    assert!((5..8).contains(&start.y), "y = {}", start.y);

    let outcome = sim.force_plan(alice, "go to cafe").await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Moved {
            destination: BuildingType::Cafe,
            moved: true
        }
    );

    let after = sim.agent(alice).await.unwrap();
    assert_eq!(after.summary.position, start.step_toward(Position::new(10, 15), 1));
    assert!((after.summary.position.x - start.x).abs() <= 1);
    assert!((after.summary.position.y - start.y).abs() <= 1);
    assert!(after.summary.current_action.contains("going to cafe"));
}

#[tokio::test]
async fn forced_talk_records_one_conversation_for_both() {
    let config = config_with(vec![building("cottage", BuildingType::House, 5, 5, 2, 1)]);
    let model = ScriptedModel::with_rules(
        &[("Start a natural conversation", "Good morning, lovely day!")],
        "rest",
    );
    let sim = Simulation::new(&config, Arc::new(model)).unwrap();
    let alice = sim
        .add_agent(NewAgent::new("Alice", "friendly").at_home("cottage"))
        .await
        .unwrap();
    let bob = sim
        .add_agent(NewAgent::new("Bob", "thoughtful").at_home("cottage"))
        .await
        .unwrap();

    let outcome = sim.force_plan(alice, "talk to").await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Talked {
            partner: String::from("Bob"),
            message: String::from("Good morning, lovely day!")
        }
    );

    let world = sim.snapshot().await;
    assert_eq!(world.conversations.len(), 1);
    assert_eq!(world.conversations[0].speaker, "Alice");
    assert_eq!(world.conversations[0].listener, "Bob");

    let alice_detail = sim.agent(alice).await.unwrap();
    let bob_detail = sim.agent(bob).await.unwrap();
    assert_eq!(alice_detail.conversations, world.conversations);
    assert_eq!(bob_detail.conversations, world.conversations);

    assert_eq!(alice_detail.relationships.len(), 1);
    assert_eq!(alice_detail.relationships[0].agent_id, bob);
    assert_eq!(alice_detail.relationships[0].name, "Bob");
    assert_eq!(alice_detail.relationships[0].score, dec!(0.1));
    assert_eq!(bob_detail.relationships[0].agent_id, alice);
    assert_eq!(bob_detail.relationships[0].score, dec!(0.1));

    assert!(alice_detail
        .memories
        .iter()
        .any(|m| m.content == "Talked to Bob: Good morning, lovely day!" && m.importance == dec!(0.7)));
}

#[tokio::test]
async fn talk_with_nobody_around_is_a_no_op() {
    let config = config_with(vec![
        building("cottage", BuildingType::House, 5, 5, 1, 1),
        building("far", BuildingType::Park, 40, 40, 1, 1),
    ]);
    let sim = Simulation::new(&config, Arc::new(ScriptedModel::replying("Hi!"))).unwrap();
    let alice = sim
        .add_agent(NewAgent::new("Alice", "friendly").at_home("cottage"))
        .await
        .unwrap();
    sim.add_agent(NewAgent::new("Bob", "distant").at_home("far"))
        .await
        .unwrap();

    let outcome = sim.force_plan(alice, "chat with anyone").await.unwrap();
    assert_eq!(outcome, Outcome::NoPartner);
    assert!(sim.snapshot().await.conversations.is_empty());
    let detail = sim.agent(alice).await.unwrap();
    assert!(detail.relationships.is_empty());
    assert_eq!(detail.summary.current_action, "chat with anyone");
}

#[tokio::test]
async fn blocked_cell_fails_the_move_silently() {
    let config = config_with(vec![
        building("left", BuildingType::House, 0, 0, 1, 1),
        building("right", BuildingType::Shop, 1, 0, 1, 1),
        building("cafe", BuildingType::Cafe, 9, 0, 1, 1),
    ]);
    let sim = Simulation::new(&config, Arc::new(ScriptedModel::replying("rest"))).unwrap();
    let walker = sim
        .add_agent(NewAgent::new("Walker", "restless").at_home("left"))
        .await
        .unwrap();
    sim.add_agent(NewAgent::new("Blocker", "stubborn").at_home("right"))
        .await
        .unwrap();

    let outcome = sim.force_plan(walker, "I want to go to the cafe").await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Moved {
            destination: BuildingType::Cafe,
            moved: false
        }
    );
    let detail = sim.agent(walker).await.unwrap();
    assert_eq!(detail.summary.position, Position::new(0, 0));
    assert_eq!(detail.summary.current_action, "going to cafe");
}

#[tokio::test]
async fn unmatched_plan_only_logs_a_memory() {
    let config = config_with(vec![building("house1", BuildingType::House, 5, 5, 3, 3)]);
    let sim = Simulation::new(&config, Arc::new(ScriptedModel::replying("rest"))).unwrap();
    let alice = sim.add_agent(NewAgent::new("Alice", "calm")).await.unwrap();
    let before = sim.agent(alice).await.unwrap();

    let outcome = sim.force_plan(alice, "gaze at the clouds").await.unwrap();
    assert_eq!(outcome, Outcome::Idle);

    let after = sim.agent(alice).await.unwrap();
    assert_eq!(after.summary.position, before.summary.position);
    assert_eq!(after.energy, before.energy);
    assert_eq!(after.hunger, before.hunger);
    assert_eq!(after.summary.current_action, "gaze at the clouds");
    assert_eq!(after.memories.len(), 1);
    assert_eq!(after.memories[0].content, "I decided to: gaze at the clouds");
    assert_eq!(after.memories[0].importance, dec!(0.5));
}
