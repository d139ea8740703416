use serde_json::{json, Value};

use super::{FieldErrors, Fields, Represent};
use crate::database::models::{Team, TeamDraft};

/// Country codes are exactly two characters.
pub fn team_draft(body: &Value) -> Result<TeamDraft, FieldErrors> {
    let mut fields = Fields::new(body)?;
    let name = fields.required_str("name", 60);
    let country = fields.required_str("country", 2);
    if matches!(country, Some(ref c) if c.chars().count() != 2) {
        fields.error("country", "Ensure this field has at least 2 characters.");
    }
    fields.finish(|| Some(TeamDraft { name: name?, country: country? }))
}

impl Represent for Team {
    fn represent(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "country": self.country,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_must_be_two_characters() {
        let errors = team_draft(&json!({ "name": "Lech", "country": "P" })).unwrap_err().into_map();
        assert_eq!(errors["country"], vec!["Ensure this field has at least 2 characters."]);

        let errors = team_draft(&json!({ "name": "Lech", "country": "POL" })).unwrap_err().into_map();
        assert_eq!(errors["country"], vec!["Ensure this field has no more than 2 characters."]);

        let draft = team_draft(&json!({ "id": 99, "name": "Lech", "country": "PL" })).unwrap();
        assert_eq!(draft.country, "PL");
    }
}
