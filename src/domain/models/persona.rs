//! Persona profile model

use serde::Serialize;

use crate::constants::{
    MAX_CUSTOM_INSTRUCTIONS_CHARS, PERSONA_SCORE_MAX, PERSONA_SCORE_MIN, PERSONA_SCORE_NEUTRAL,
};

/// Tone and style settings for generated posts. Scores run 1..=5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaProfile {
    pub name: Option<String>,
    pub politeness: u8,
    pub casualness: u8,
    pub positivity: u8,
    pub emoji_usage: u8,
    pub humor: u8,
    pub custom_instructions: Option<String>,
}

impl Default for PersonaProfile {
    fn default() -> Self {
        Self::neutral()
    }
}

impl PersonaProfile {
    pub fn neutral() -> Self {
        Self {
            name: None,
            politeness: PERSONA_SCORE_NEUTRAL,
            casualness: PERSONA_SCORE_NEUTRAL,
            positivity: PERSONA_SCORE_NEUTRAL,
            emoji_usage: PERSONA_SCORE_NEUTRAL,
            humor: PERSONA_SCORE_NEUTRAL,
            custom_instructions: None,
        }
    }
}

/// Row from `persona_profiles`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersonaRow {
    pub name: Option<String>,
    pub politeness: i16,
    pub casualness: i16,
    pub positivity: i16,
    pub emoji_usage: i16,
    pub humor: i16,
    pub custom_instructions: Option<String>,
}

impl From<PersonaRow> for PersonaProfile {
    fn from(row: PersonaRow) -> Self {
        Self {
            name: row.name.filter(|n| !n.trim().is_empty()),
            politeness: clamp_score(row.politeness),
            casualness: clamp_score(row.casualness),
            positivity: clamp_score(row.positivity),
            emoji_usage: clamp_score(row.emoji_usage),
            humor: clamp_score(row.humor),
            custom_instructions: row
                .custom_instructions
                .map(|s| sanitize_instructions(&s))
                .filter(|s| !s.is_empty()),
        }
    }
}

fn clamp_score(raw: i16) -> u8 {
    raw.clamp(PERSONA_SCORE_MIN as i16, PERSONA_SCORE_MAX as i16) as u8
}

/// Sanitize free-text style instructions before they reach a prompt
pub fn sanitize_instructions(input: &str) -> String {
    let s: String = input.chars().take(MAX_CUSTOM_INSTRUCTIONS_CHARS).collect();
    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");

    // Monitor only, never block
    let lowered = s.to_lowercase();
    let suspicious = [
        "ignore previous",
        "system prompt",
        "you are now",
        "disregard",
        "forget your instructions",
    ];
    for pattern in suspicious {
        if lowered.contains(pattern) {
            tracing::warn!(pattern, "Suspicious persona instruction pattern detected");
        }
    }

    s
}
