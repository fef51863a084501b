//! Domain models

mod event;
mod persona;
mod post;

pub use event::{Event, EventKind, EventRow, PostType, ThemeRow};
pub use persona::{PersonaProfile, PersonaRow};
pub use post::{AttemptLogRecord, NewAttemptLog, NewPostRecord, PostRecord, PostStatus};
