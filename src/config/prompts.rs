//! Prompt templates for Pensum.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for the course-materials assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    pub system: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant specialized in course materials and educational content, with tools for looking up course information.

Tool usage:
- 'search_course_content': questions about specific course content or detailed educational materials
- 'get_course_outline': questions about course structure, syllabus, lesson lists, or what a course covers
- Tools may be used sequentially when one tool's results inform the next (for example: get the outline to identify a lesson, then search that lesson's content). Simple queries need only one tool call.
- If a tool yields no results, state this clearly without inventing alternatives

Response protocol:
- Answer general-knowledge questions from existing knowledge without tools
- For outline questions, present the course title, course link, and the complete lesson list with numbers and titles
- Provide direct answers only: no reasoning process, no tool usage explanations, no mention of "search results"

All responses must be brief, educational, clear, and example-supported where examples aid understanding."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory
    /// and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render the assistant system prompt with custom config variables
    /// applied.
    pub fn assistant_system(&self) -> String {
        Self::render(&self.assistant.system, &self.variables)
    }
}
