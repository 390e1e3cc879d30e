//! Gemma-style turn template.

use crate::model::{Message, Role};

/// Default system instructions: describes the weather tool and the JSON
/// shape the model should emit to call it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. You can look up current \
weather with one tool.\n\n\
weather: current conditions for a location given as 'City, CC', where CC is an ISO-3166 \
country code or a US state code (e.g. 'San Juan, PR', 'Paris, FR').\n\n\
To use it, write one short sentence, then exactly one JSON object and nothing after it:\n\
{\"tool_name\": \"weather\", \"parameters\": {\"location\": \"City, CC\"}}\n\
Only call the tool for weather questions. Otherwise answer directly.";

/// Appended to the system turn when the request has tools off.
pub const TOOLS_DISABLED_NOTE: &str =
    "\n\nIMPORTANT: Tools are disabled. Answer normally without calling functions.";

/// Renders conversation history into a single completion prompt.
#[derive(Debug, Clone)]
pub struct PromptFormatter {
    system: String,
}

impl Default for PromptFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptFormatter {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Build the prompt, ending with an open model turn.
    pub fn format(&self, messages: &[Message], tools_enabled: bool) -> String {
        let mut prompt = String::from("<bos>");

        let note = if tools_enabled { "" } else { TOOLS_DISABLED_NOTE };
        push_turn(&mut prompt, "system", &format!("{}{note}", self.system));

        for message in messages {
            push_turn(&mut prompt, role_tag(message.role), &message.content);
        }

        prompt.push_str("<start_of_turn>model\n");
        prompt
    }
}

fn role_tag(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn push_turn(prompt: &mut String, tag: &str, content: &str) {
    prompt.push_str("<start_of_turn>");
    prompt.push_str(tag);
    prompt.push('\n');
    prompt.push_str(content);
    prompt.push_str("<end_of_turn>\n");
}
