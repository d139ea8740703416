pub mod owned_person;
pub mod person;
pub mod position;
pub mod session;
pub mod team;
pub mod user;

pub use owned_person::{OwnedPerson, OwnedPersonDraft, Sex};
pub use person::{Person, PersonDraft, ShirtSize};
pub use position::{Position, PositionDraft};
pub use session::Session;
pub use team::{Team, TeamDraft};
pub use user::{NewUser, User};

/// A stored string that does not name any variant of the target enum.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} value '{value}'")]
pub struct InvalidChoice {
    pub kind: &'static str,
    pub value: String,
}
