//! Turning free-text plans into commands.
//!
//! Model output is unstructured, so interpretation is a handful of
//! case-insensitive substring rules checked in a fixed order. The first
//! rule that matches decides the command; anything else is
//! [`Command::Unknown`], which is not an error.

use town_types::BuildingType;

/// What an agent's plan asks the world to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "building", rename_all = "snake_case")]
pub enum Command {
    /// Walk one step toward the nearest building of this type.
    Move(BuildingType),
    /// Speak to someone close by.
    Talk,
    /// Rest, which only helps at home.
    Rest,
    /// Eat something.
    Eat,
    /// Nothing the world understands.
    Unknown,
}

/// Interpret a plan.
///
/// Rules, in order:
/// 1. `go to` followed somewhere by a building type name. The type that
///    appears first after `go to` wins.
/// 2. `talk to` or `chat with`.
/// 3. `rest` or `sleep`.
/// 4. `eat`.
pub fn interpret(plan: &str) -> Command {
    let text = plan.to_lowercase();

    if let Some(kind) = destination(&text) {
        return Command::Move(kind);
    }
    if text.contains("talk to") || text.contains("chat with") {
        return Command::Talk;
    }
    if text.contains("rest") || text.contains("sleep") {
        return Command::Rest;
    }
    if text.contains("eat") {
        return Command::Eat;
    }
    Command::Unknown
}

fn destination(text: &str) -> Option<BuildingType> {
    let (_, rest) = text.split_once("go to")?;
    BuildingType::ALL
        .into_iter()
        .filter_map(|kind| rest.find(kind.as_str()).map(|at| (at, kind)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, kind)| kind)
}
