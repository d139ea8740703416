use serde_json::{json, Value};

use super::{Fields, Represent};
use crate::database::models::{OwnedPerson, OwnedPersonDraft, Sex};
use crate::database::Store;
use crate::error::ApiError;

/// Validate an owned-person payload. The owner always comes from the caller;
/// any `owner` or `created_at` in the body is ignored.
pub async fn owned_person_draft(store: &Store, body: &Value, owner_id: i64) -> Result<OwnedPersonDraft, ApiError> {
    let mut fields = Fields::new(body)?;
    let first_name = fields.required_str("first_name", 50);
    let last_name = fields.required_str("last_name", 100);
    let sex = fields.choice("sex", Sex::parse, None);
    let position_id = fields.optional_pk("position", None);

    if let Some(Some(position)) = position_id {
        if !store.positions.exists(position).await? {
            fields.missing_reference("position", position);
        }
    }

    Ok(fields.finish(|| {
        Some(OwnedPersonDraft {
            first_name: first_name?,
            last_name: last_name?,
            sex: sex?,
            position_id: position_id?,
            owner_id,
        })
    })?)
}

impl Represent for OwnedPerson {
    fn represent(&self) -> Value {
        json!({
            "id": self.id,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "sex": self.sex,
            "created_at": self.created_at,
            "position": self.position_id,
            "owner": self.owner_id,
        })
    }
}
