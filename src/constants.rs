//! Application constants

/// Maximum rendered length of a post, in characters
pub const MAX_POST_CHARS: usize = 280;

/// Default page size for paginated list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Maximum page size for paginated list endpoints
pub const MAX_PAGE_SIZE: i64 = 100;

/// Maximum length of persona custom instructions after sanitizing
pub const MAX_CUSTOM_INSTRUCTIONS_CHARS: usize = 2000;

/// Lowest persona trait score
pub const PERSONA_SCORE_MIN: u8 = 1;

/// Highest persona trait score
pub const PERSONA_SCORE_MAX: u8 = 5;

/// Neutral persona trait score, used when no profile is configured
pub const PERSONA_SCORE_NEUTRAL: u8 = 3;
