//! Prompt composition
//!
//! Pure: builds the system/user prompt pair from an event and an optional
//! persona. The event title is the one mandatory descriptive field.

use std::fmt::Write as _;

use crate::constants::MAX_POST_CHARS;
use crate::domain::{Event, EventKind, PersonaProfile};
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct PromptComposer {
    platform: String,
    max_chars: usize,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new("X (formerly Twitter)", MAX_POST_CHARS)
    }
}

impl PromptComposer {
    pub fn new(platform: &str, max_chars: usize) -> Self {
        Self {
            platform: platform.to_string(),
            max_chars,
        }
    }

    pub fn compose(
        &self,
        event: &Event,
        persona: Option<&PersonaProfile>,
    ) -> Result<Prompt, PipelineError> {
        if event.title.trim().is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "event {} has no title",
                event.id
            )));
        }

        let neutral = PersonaProfile::neutral();
        let persona = persona.unwrap_or(&neutral);

        Ok(Prompt {
            system: self.system_prompt(persona),
            user: user_prompt(event),
        })
    }

    fn system_prompt(&self, persona: &PersonaProfile) -> String {
        let mut s = format!(
            "You write posts for {} on behalf of the account owner.\n",
            self.platform
        );
        if let Some(name) = &persona.name {
            let _ = writeln!(s, "Persona: {}", name);
        }

        s.push_str("\nVoice:\n");
        let _ = writeln!(s, "- Politeness: {}", politeness(persona.politeness));
        let _ = writeln!(s, "- Register: {}", casualness(persona.casualness));
        let _ = writeln!(s, "- Outlook: {}", positivity(persona.positivity));
        let _ = writeln!(s, "- Humor: {}", humor(persona.humor));
        let _ = writeln!(s, "- Emoji: {}", emoji(persona.emoji_usage));

        s.push_str("\nRules:\n");
        let _ = writeln!(
            s,
            "- Keep it under {} characters, counting spaces and emoji",
            self.max_chars
        );
        s.push_str("- Write one self-contained post, not a thread\n");
        s.push_str("- At most two hashtags\n");
        s.push_str(
            "- No AI-sounding phrases: \"excited to share\", \"dive into\", \"game-changer\", \"incredibly\"\n",
        );
        s.push_str("- No over-explaining or hedging\n");

        if let Some(extra) = &persona.custom_instructions {
            let _ = write!(s, "\nOwner's style preferences:\n{}\n", extra);
        }

        s.push_str("\nRespond with ONLY the post text, nothing else.");
        s
    }
}

fn user_prompt(event: &Event) -> String {
    let subject = match event.kind {
        EventKind::Calendar => "calendar event",
        EventKind::Theme => "theme of the day",
    };

    let mut s = format!("Write a post about this {}.\n\nTitle: {}\n", subject, event.title);
    if let Some(date) = event.date {
        let _ = writeln!(s, "Date: {}", date.format("%A, %B %-d, %Y"));
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(s, "Details: {}", description);
    }
    let tags: Vec<&str> = event
        .tags
        .iter()
        .map(|t| t.trim().trim_start_matches('#'))
        .filter(|t| !t.is_empty())
        .collect();
    if !tags.is_empty() {
        let _ = writeln!(s, "Tags: {}", tags.join(", "));
    }
    s
}

fn politeness(score: u8) -> &'static str {
    match score {
        0..=1 => "blunt and direct",
        2 => "direct but courteous",
        3 => "courteous",
        4 => "warm and polite",
        _ => "very polite and respectful",
    }
}

fn casualness(score: u8) -> &'static str {
    match score {
        0..=1 => "formal",
        2 => "mostly formal",
        3 => "conversational",
        4 => "casual",
        _ => "very casual, like texting a friend",
    }
}

fn positivity(score: u8) -> &'static str {
    match score {
        0..=1 => "dry and matter-of-fact",
        2 => "measured",
        3 => "balanced",
        4 => "upbeat",
        _ => "enthusiastic",
    }
}

fn humor(score: u8) -> &'static str {
    match score {
        0..=1 => "none",
        2 => "rare",
        3 => "light when it fits",
        4 => "playful",
        _ => "witty throughout",
    }
}

fn emoji(score: u8) -> &'static str {
    match score {
        0..=1 => "do not use emoji",
        2 => "at most one emoji",
        3 => "one or two emoji when natural",
        4 => "a few emoji",
        _ => "generous emoji",
    }
}
