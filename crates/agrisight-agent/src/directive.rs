//! Directive builder — the system message pinned at the top of every history.
//!
//! The base text sets the assistant persona. When the user has a profile,
//! a short "About the user" block is appended so the model can tailor
//! language and regional advice.

use std::collections::HashMap;

/// Profile keys rendered into the directive, with their labels.
const PROFILE_FIELDS: &[(&str, &str)] = &[
    ("name", "Name"),
    ("language", "Preferred language"),
    ("region", "Farming region"),
    ("state_province", "State/province"),
    ("country", "Country"),
];

/// Builds the system directive for a user.
#[derive(Clone, Debug)]
pub struct DirectiveBuilder {
    agent_name: String,
    /// Replaces the built-in persona text when set.
    custom: Option<String>,
}

impl DirectiveBuilder {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            custom: None,
        }
    }

    /// Use `text` instead of the built-in persona.
    pub fn with_custom(mut self, text: Option<String>) -> Self {
        self.custom = text.filter(|t| !t.trim().is_empty());
        self
    }

    /// Build the directive text for a user profile (possibly empty).
    pub fn build(&self, profile: &HashMap<String, String>) -> String {
        let mut text = self.custom.clone().unwrap_or_else(|| self.persona());

        let about: Vec<String> = PROFILE_FIELDS
            .iter()
            .filter_map(|(key, label)| {
                let value = profile.get(*key)?.trim();
                (!value.is_empty()).then(|| format!("- {label}: {value}"))
            })
            .collect();

        if !about.is_empty() {
            text.push_str("\n\n## About the user\n");
            text.push_str(&about.join("\n"));
            if profile.get("language").is_some_and(|l| !l.trim().is_empty()) {
                text.push_str("\n\nReply in the user's preferred language.");
            }
        }

        text
    }

    fn persona(&self) -> String {
        format!(
            "You are {name}, a helpful AI assistant for Southeast Asian farmers. \
             Keep your answers concise and focused, aiming for 2-4 paragraphs unless asked for more detail. \
             Use standard Markdown formatting like **bold**, *italic*, `code`, [links](https://example.com), \
             and bullet points (* item or - item). \
             Structure information clearly.",
            name = self.agent_name
        )
    }
}
