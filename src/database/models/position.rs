use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, FromRow, Postgres};

use crate::database::repository::Entity;

/// A staff position; owned persons may point at one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PositionDraft {
    pub name: String,
    pub description: Option<String>,
}

impl Entity for Position {
    type Draft = PositionDraft;

    const TABLE: &'static str = "positions";
    const NAME: &'static str = "Position";
    const COLUMNS: &'static [&'static str] = &["name", "description"];

    fn from_draft(id: i64, draft: PositionDraft) -> Self {
        Self { id, name: draft.name, description: draft.description }
    }

    fn apply(&mut self, draft: PositionDraft) {
        self.name = draft.name;
        self.description = draft.description;
    }

    fn bind<'q>(
        draft: &'q PositionDraft,
        query: QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> QueryAs<'q, Postgres, Self, PgArguments> {
        query.bind(&draft.name).bind(&draft.description)
    }
}
