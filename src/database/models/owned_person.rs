use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, FromRow, Postgres};
use std::fmt;

use super::InvalidChoice;
use crate::database::repository::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
    Other,
}

impl Sex {
    pub const CHOICES: [Sex; 3] = [Sex::Female, Sex::Male, Sex::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Female => "female",
            Sex::Male => "male",
            Sex::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::CHOICES.into_iter().find(|c| c.as_str() == value)
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Sex {
    type Error = InvalidChoice;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(InvalidChoice { kind: "sex", value })
    }
}

/// A person record that belongs to the user who created it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OwnedPerson {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub sex: Sex,
    pub position_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
pub struct OwnedPersonDraft {
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    pub position_id: Option<i64>,
    pub owner_id: i64,
}

impl Entity for OwnedPerson {
    type Draft = OwnedPersonDraft;

    const TABLE: &'static str = "owned_persons";
    const NAME: &'static str = "Owned person";
    // created_at is filled in by the database default
    const COLUMNS: &'static [&'static str] = &["first_name", "last_name", "sex", "position_id", "owner_id"];

    fn from_draft(id: i64, draft: OwnedPersonDraft) -> Self {
        Self {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            sex: draft.sex,
            position_id: draft.position_id,
            created_at: Utc::now(),
            owner_id: draft.owner_id,
        }
    }

    fn apply(&mut self, draft: OwnedPersonDraft) {
        self.first_name = draft.first_name;
        self.last_name = draft.last_name;
        self.sex = draft.sex;
        self.position_id = draft.position_id;
        self.owner_id = draft.owner_id;
    }

    fn bind<'q>(
        draft: &'q OwnedPersonDraft,
        query: QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> QueryAs<'q, Postgres, Self, PgArguments> {
        query
            .bind(&draft.first_name)
            .bind(&draft.last_name)
            .bind(draft.sex.as_str())
            .bind(draft.position_id)
            .bind(draft.owner_id)
    }
}
