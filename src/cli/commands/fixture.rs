//! Seed data from a JSON file:
//!
//! ```json
//! {
//!   "teams": [{ "name": "Orly", "country": "PL" }],
//!   "positions": [{ "name": "Goalkeeper", "description": "Stands in the goal" }],
//!   "persons": [{ "name": "Ola", "shirt_size": "M", "month_added": 3, "team_name": "Orly" }]
//! }
//! ```
//!
//! Persons may name their team with `team_name` since ids are only known
//! once the teams are inserted. Records are validated exactly as the API
//! validates them.

use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::cli::config::open_state;
use crate::cli::utils::{describe_api_error, output_success};
use crate::cli::OutputFormat;
use crate::database::Store;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::serializer::{person_draft, position_draft, team_draft};

#[derive(Subcommand)]
pub enum FixtureCommands {
    #[command(about = "Insert the fixture records into the configured database")]
    Load {
        #[arg(help = "Fixture JSON file")]
        file: PathBuf,
    },

    #[command(about = "Validate a fixture file without touching the database")]
    Check {
        #[arg(help = "Fixture JSON file")]
        file: PathBuf,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FixtureSummary {
    pub teams: usize,
    pub positions: usize,
    pub persons: usize,
}

pub async fn handle(cmd: FixtureCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        FixtureCommands::Load { file } => {
            let fixtures = read_fixtures(&file)?;
            let state = open_state().await?;
            let summary = load_fixtures(&state.store, &fixtures).await?;
            output_success(
                &output_format,
                &format!(
                    "Loaded {} teams, {} positions and {} persons from {}",
                    summary.teams,
                    summary.positions,
                    summary.persons,
                    file.display()
                ),
                Some(json!({ "loaded": summary })),
            )
        }
        FixtureCommands::Check { file } => {
            let fixtures = read_fixtures(&file)?;
            let summary = load_fixtures(&Store::memory(), &fixtures).await?;
            output_success(
                &output_format,
                &format!("{} is valid", file.display()),
                Some(json!({ "records": summary })),
            )
        }
    }
}

fn read_fixtures(file: &PathBuf) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", file.display()))
}

fn section<'a>(fixtures: &'a Value, name: &str) -> anyhow::Result<&'a [Value]> {
    match fixtures.get(name) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => anyhow::bail!("'{}' must be an array", name),
    }
}

/// Insert teams, then positions, then persons. Stops at the first invalid
/// record; rows inserted before it stay.
pub async fn load_fixtures(store: &Store, fixtures: &Value) -> anyhow::Result<FixtureSummary> {
    if !fixtures.is_object() {
        anyhow::bail!("fixture file must contain a JSON object");
    }
    let mut summary = FixtureSummary::default();

    for (i, body) in section(fixtures, "teams")?.iter().enumerate() {
        let draft = team_draft(body)
            .map_err(|e| describe_api_error(e.into()).context(format!("teams[{}]", i)))?;
        store.teams.insert(draft).await?;
        summary.teams += 1;
    }

    for (i, body) in section(fixtures, "positions")?.iter().enumerate() {
        let draft = position_draft(body)
            .map_err(|e| describe_api_error(e.into()).context(format!("positions[{}]", i)))?;
        store.positions.insert(draft).await?;
        summary.positions += 1;
    }

    for (i, body) in section(fixtures, "persons")?.iter().enumerate() {
        let body = resolve_team_name(store, body)
            .await
            .with_context(|| format!("persons[{}]", i))?;
        let draft = person_draft(store, &body, None)
            .await
            .map_err(|e| describe_api_error(e).context(format!("persons[{}]", i)))?;
        store.persons.insert(draft).await?;
        summary.persons += 1;
    }

    tracing::info!(
        "Fixtures loaded: {} teams, {} positions, {} persons",
        summary.teams,
        summary.positions,
        summary.persons
    );
    Ok(summary)
}

/// Swap a `team_name` for the `team` id of the first team with that name.
async fn resolve_team_name(store: &Store, body: &Value) -> anyhow::Result<Value> {
    let Some(name) = body.get("team_name").and_then(Value::as_str) else {
        return Ok(body.clone());
    };

    let team = store
        .teams
        .select_any(FilterData::with_where(json!({ "name": name })))
        .await
        .map_err(|e| describe_api_error(ApiError::from(e)))?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("unknown team '{}'", name))?;

    let mut body = body.clone();
    if let Some(object) = body.as_object_mut() {
        object.remove("team_name");
        object.insert("team".to_string(), json!(team.id));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_sections_in_dependency_order() {
        let store = Store::memory();
        let fixtures = json!({
            "teams": [{ "name": "Orly", "country": "PL" }, { "name": "Lions", "country": "GB" }],
            "positions": [{ "name": "Goalkeeper" }],
            "persons": [
                { "name": "Ola", "shirt_size": "M", "team_name": "Lions" },
                { "name": "Jan" }
            ]
        });

        let summary = load_fixtures(&store, &fixtures).await.unwrap();
        assert_eq!(summary, FixtureSummary { teams: 2, positions: 1, persons: 2 });

        let ola = store.persons.select_404(1).await.unwrap();
        assert_eq!(ola.team_id, Some(2));
        assert_eq!(store.persons.select_404(2).await.unwrap().team_id, None);
    }

    #[tokio::test]
    async fn reports_the_failing_record() {
        let store = Store::memory();
        let fixtures = json!({ "teams": [{ "name": "Orly", "country": "POL" }] });

        let err = load_fixtures(&store, &fixtures).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with("teams[0]"), "{}", message);
        assert!(message.contains("country"), "{}", message);
    }

    #[tokio::test]
    async fn unknown_team_names_fail() {
        let store = Store::memory();
        let fixtures = json!({ "persons": [{ "name": "Ola", "team_name": "Nobody" }] });
        let err = load_fixtures(&store, &fixtures).await.unwrap_err();
        assert!(format!("{:#}", err).contains("unknown team 'Nobody'"));
    }
}
