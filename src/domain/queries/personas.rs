//! Persona domain - DB queries for persona profiles

use sqlx::{Executor, Postgres};

use super::super::models::{PersonaProfile, PersonaRow};

/// Get a user's persona profile, if one is configured
pub async fn get_persona<'e, E>(
    executor: E,
    user_id: i64,
) -> Result<Option<PersonaProfile>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<PersonaRow> = sqlx::query_as(
        r#"
        SELECT name, politeness, casualness, positivity, emoji_usage, humor, custom_instructions
        FROM persona_profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(PersonaProfile::from))
}
