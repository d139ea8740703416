use serde_json::{json, Value};

use super::{Fields, Represent};
use crate::database::models::{Person, PersonDraft, ShirtSize};
use crate::database::Store;
use crate::error::ApiError;

/// Validate a person payload. On update, optional fields missing from the
/// body keep the values of `existing`.
pub async fn person_draft(store: &Store, body: &Value, existing: Option<&Person>) -> Result<PersonDraft, ApiError> {
    let mut fields = Fields::new(body)?;
    let name = fields.required_str("name", 60);
    let shirt_size = fields.choice(
        "shirt_size",
        ShirtSize::parse,
        Some(existing.map(|p| p.shirt_size).unwrap_or_default()),
    );
    let month_added = fields.integer("month_added", 1, 12, existing.map(|p| p.month_added).unwrap_or(1));
    let team_id = fields.optional_pk("team", existing.and_then(|p| p.team_id));

    if let Some(Some(team)) = team_id {
        if !store.teams.exists(team).await? {
            fields.missing_reference("team", team);
        }
    }

    Ok(fields.finish(|| {
        Some(PersonDraft {
            name: name?,
            shirt_size: shirt_size?,
            month_added: month_added?,
            team_id: team_id?,
        })
    })?)
}

impl Represent for Person {
    fn represent(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "shirt_size": self.shirt_size,
            "month_added": self.month_added,
            "team": self.team_id,
        })
    }
}
