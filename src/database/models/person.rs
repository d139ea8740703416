use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, FromRow, Postgres};
use std::fmt;

use super::InvalidChoice;
use crate::database::repository::Entity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShirtSize {
    #[default]
    S,
    M,
    L,
}

impl ShirtSize {
    pub const CHOICES: [ShirtSize; 3] = [ShirtSize::S, ShirtSize::M, ShirtSize::L];

    pub fn as_str(self) -> &'static str {
        match self {
            ShirtSize::S => "S",
            ShirtSize::M => "M",
            ShirtSize::L => "L",
        }
    }

    /// Human-readable label shown on the HTML pages.
    pub fn label(self) -> &'static str {
        match self {
            ShirtSize::S => "Small",
            ShirtSize::M => "Medium",
            ShirtSize::L => "Large",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::CHOICES.into_iter().find(|c| c.as_str() == value)
    }
}

impl fmt::Display for ShirtSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ShirtSize {
    type Error = InvalidChoice;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(InvalidChoice { kind: "shirt_size", value })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Person {
    pub id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub shirt_size: ShirtSize,
    pub month_added: i32,
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PersonDraft {
    pub name: String,
    pub shirt_size: ShirtSize,
    pub month_added: i32,
    pub team_id: Option<i64>,
}

impl Entity for Person {
    type Draft = PersonDraft;

    const TABLE: &'static str = "persons";
    const NAME: &'static str = "Person";
    const COLUMNS: &'static [&'static str] = &["name", "shirt_size", "month_added", "team_id"];

    fn from_draft(id: i64, draft: PersonDraft) -> Self {
        Self {
            id,
            name: draft.name,
            shirt_size: draft.shirt_size,
            month_added: draft.month_added,
            team_id: draft.team_id,
        }
    }

    fn apply(&mut self, draft: PersonDraft) {
        self.name = draft.name;
        self.shirt_size = draft.shirt_size;
        self.month_added = draft.month_added;
        self.team_id = draft.team_id;
    }

    fn bind<'q>(
        draft: &'q PersonDraft,
        query: QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> QueryAs<'q, Postgres, Self, PgArguments> {
        query
            .bind(&draft.name)
            .bind(draft.shirt_size.as_str())
            .bind(draft.month_added)
            .bind(draft.team_id)
    }
}
