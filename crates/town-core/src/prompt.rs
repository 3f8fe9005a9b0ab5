//! Prompt rendering via `minijinja`.
//!
//! The built-in templates are compiled into the binary. Operators can
//! override any of them by pointing `templates_dir` at a directory holding
//! files of the same name; missing files fall back to the built-ins.

use std::path::Path;

use minijinja::Environment;
use serde::Serialize;

/// Template names paired with their built-in sources.
const TEMPLATES: [(&str, &str); 5] = [
    ("context.j2", include_str!("../templates/context.j2")),
    ("plan_system.j2", include_str!("../templates/plan_system.j2")),
    ("plan_user.j2", include_str!("../templates/plan_user.j2")),
    ("talk_system.j2", include_str!("../templates/talk_system.j2")),
    ("talk_user.j2", include_str!("../templates/talk_user.j2")),
];

/// Errors from loading or rendering templates.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// A template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Read {
        /// File that failed.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A template failed to compile or render.
    #[error("template {name}: {source}")]
    Template {
        /// Template name.
        name: String,
        /// The underlying template error.
        source: minijinja::Error,
    },
}

/// A rendered system and user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message.
    pub system: String,
    /// User message.
    pub user: String,
}

/// Holds the compiled prompt templates.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Engine using only the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Template`] if a built-in template fails to
    /// compile.
    pub fn builtin() -> Result<Self, PromptError> {
        let mut env = Self::environment();
        for (name, source) in TEMPLATES {
            env.add_template(name, source).map_err(|source| PromptError::Template {
                name: name.to_owned(),
                source,
            })?;
        }
        Ok(Self { env })
    }

    /// Engine preferring templates found in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Read`] if an existing file cannot be read and
    /// [`PromptError::Template`] if any template fails to compile.
    pub fn from_dir(dir: &Path) -> Result<Self, PromptError> {
        let mut env = Self::environment();
        for (name, builtin) in TEMPLATES {
            let path = dir.join(name);
            let added = if path.is_file() {
                let source = std::fs::read_to_string(&path).map_err(|source| PromptError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                tracing::info!(template = name, path = %path.display(), "Using template override");
                env.add_template_owned(name, source)
            } else {
                env.add_template(name, builtin)
            };
            added.map_err(|source| PromptError::Template {
                name: name.to_owned(),
                source,
            })?;
        }
        Ok(Self { env })
    }

    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env
    }

    /// Render one template.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Template`] if the template is missing or
    /// rendering fails.
    pub fn render(&self, name: &str, ctx: &impl Serialize) -> Result<String, PromptError> {
        let wrap = |source: minijinja::Error| PromptError::Template {
            name: name.to_owned(),
            source,
        };
        let rendered = self.env.get_template(name).map_err(wrap)?.render(ctx).map_err(wrap)?;
        Ok(rendered.trim().to_owned())
    }

    /// Render a system and user template pair.
    ///
    /// # Errors
    ///
    /// Propagates [`PromptError`] from either template.
    pub fn render_pair(
        &self,
        system: &str,
        user: &str,
        ctx: &impl Serialize,
    ) -> Result<RenderedPrompt, PromptError> {
        Ok(RenderedPrompt {
            system: self.render(system, ctx)?,
            user: self.render(user, ctx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn builtin_templates_compile() {
        let engine = PromptEngine::builtin().unwrap();
        let text = engine
            .render(
                "context.j2",
                &json!({
                    "name": "Alice",
                    "personality": "friendly",
                    "location": "cafe",
                    "mood": "neutral",
                    "energy": "100",
                    "hunger": "0",
                    "nearby": ["Bob", "Eve"],
                    "goals": [],
                }),
            )
            .unwrap();
        assert!(text.starts_with("You are Alice, a friendly AI agent in AI Town."));
        assert!(text.contains("Current location: cafe"));
        assert!(text.contains("Nearby agents: Bob, Eve"));
        assert!(!text.contains("Goals"));
    }

    #[test]
    fn plan_prompt_lists_memories() {
        let engine = PromptEngine::builtin().unwrap();
        let prompt = engine
            .render_pair(
                "plan_system.j2",
                "plan_user.j2",
                &json!({
                    "name": "Bob",
                    "personality": "quiet",
                    "context": "You are Bob.",
                    "memories": ["Ate some food"],
                }),
            )
            .unwrap();
        assert_eq!(prompt.system, "You are Bob, a quiet AI agent. Be concise and natural.");
        assert!(prompt.user.contains("- Ate some food"));
        assert!(prompt.user.contains("\"go to cafe\""));
    }

    #[test]
    fn talk_prompt_reflects_relationship() {
        let engine = PromptEngine::builtin().unwrap();
        let ctx = |friendly: bool| {
            json!({
                "name": "Alice",
                "personality": "friendly",
                "location": "outside",
                "partner": {"name": "Bob", "personality": "quiet", "friendly": friendly, "memories": []},
            })
        };
        let warm = engine.render("talk_user.j2", &ctx(true)).unwrap();
        assert!(warm.contains("Your relationship: friendly"));
        assert!(warm.contains("Recent memories: None"));
        let cool = engine.render("talk_user.j2", &ctx(false)).unwrap();
        assert!(cool.contains("Your relationship: neutral"));
    }

    #[test]
    fn directory_overrides_single_templates() {
        let dir = std::env::temp_dir().join(format!("town-prompts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("plan_system.j2"), "Custom {{ name }}").unwrap();

        let engine = PromptEngine::from_dir(&dir).unwrap();
        let text = engine.render("plan_system.j2", &json!({"name": "Eve"})).unwrap();
        assert_eq!(text, "Custom Eve");
        assert!(engine.render("talk_system.j2", &json!({"name": "Eve"})).is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
