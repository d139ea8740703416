use serde_json::{json, Value};

use super::{FieldErrors, Fields, Represent};
use crate::database::models::{Position, PositionDraft};

pub fn position_draft(body: &Value) -> Result<PositionDraft, FieldErrors> {
    let mut fields = Fields::new(body)?;
    let name = fields.required_str("name", 70);
    let description = fields.optional_str("description", None);
    fields.finish(|| {
        Some(PositionDraft {
            name: name?,
            // blank descriptions are stored as absent
            description: description?.filter(|d| !d.is_empty()),
        })
    })
}

impl Represent for Position {
    fn represent(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
        })
    }
}
