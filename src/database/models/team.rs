use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, FromRow, Postgres};

use crate::database::repository::Entity;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone)]
pub struct TeamDraft {
    pub name: String,
    pub country: String,
}

impl Entity for Team {
    type Draft = TeamDraft;

    const TABLE: &'static str = "teams";
    const NAME: &'static str = "Team";
    const COLUMNS: &'static [&'static str] = &["name", "country"];

    fn from_draft(id: i64, draft: TeamDraft) -> Self {
        Self { id, name: draft.name, country: draft.country }
    }

    fn apply(&mut self, draft: TeamDraft) {
        self.name = draft.name;
        self.country = draft.country;
    }

    fn bind<'q>(
        draft: &'q TeamDraft,
        query: QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> QueryAs<'q, Postgres, Self, PgArguments> {
        query.bind(&draft.name).bind(&draft.country)
    }
}
