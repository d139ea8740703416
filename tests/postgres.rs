//! Round trips through the Postgres backend. Skipped unless `DATABASE_URL`
//! points at a database the tests may migrate and write to.

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use roster_api::config::AppConfig;
use roster_api::database::models::{
    NewUser, OwnedPersonDraft, PersonDraft, PositionDraft, Session, Sex, ShirtSize, TeamDraft,
};
use roster_api::database::{DatabaseError, DatabaseManager, Store};
use roster_api::filter::{icontains_any, FilterData};
use roster_api::policy::Permission;

async fn postgres_store() -> Result<Option<Store>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres tests");
        return Ok(None);
    };

    let mut config = AppConfig::development().database;
    config.url = Some(url);
    let pool = DatabaseManager::connect(&config).await?;
    DatabaseManager::migrate(&pool).await?;
    Ok(Some(Store::postgres(pool)))
}

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

#[tokio::test]
async fn rows_decode_and_references_clear() -> Result<()> {
    let Some(store) = postgres_store().await? else { return Ok(()) };

    let owner = store
        .accounts
        .create_user(NewUser {
            username: unique("owner"),
            password_hash: "$argon2id$placeholder".into(),
            is_superuser: false,
        })
        .await?;

    let team = store.teams.insert(TeamDraft { name: "Orly".into(), country: "PL".into() }).await?;
    let person = store
        .persons
        .insert(PersonDraft { name: "Ola".into(), shirt_size: ShirtSize::L, month_added: 4, team_id: Some(team.id) })
        .await?;
    let fetched = store.persons.select_404(person.id).await?;
    assert_eq!(fetched.shirt_size, ShirtSize::L);
    assert_eq!(fetched.month_added, 4);
    assert_eq!(fetched.team_id, Some(team.id));

    let updated = store
        .persons
        .update(person.id, PersonDraft { name: "Olek".into(), shirt_size: ShirtSize::S, month_added: 5, team_id: None })
        .await?
        .expect("person still exists");
    assert_eq!(updated.name, "Olek");
    assert_eq!(updated.shirt_size, ShirtSize::S);
    assert_eq!(updated.team_id, None);

    let position = store
        .positions
        .insert(PositionDraft { name: "Goalkeeper".into(), description: Some("Stops shots".into()) })
        .await?;
    let marker = unique("zz");
    let owned = store
        .owned_persons
        .insert(OwnedPersonDraft {
            first_name: "Anna".into(),
            last_name: marker.clone(),
            sex: Sex::Female,
            position_id: Some(position.id),
            owner_id: owner.id,
        })
        .await?;
    assert_eq!(owned.sex, Sex::Female);
    assert!(owned.created_at <= Utc::now());

    let mine = store
        .owned_persons
        .select_any(FilterData::with_where(json!({ "owner_id": owner.id })))
        .await?;
    assert_eq!(mine.iter().map(|p| p.id).collect::<Vec<_>>(), vec![owned.id]);

    let found = store
        .owned_persons
        .select_any(icontains_any(&["first_name", "last_name"], &marker.to_uppercase()))
        .await?;
    assert_eq!(found.len(), 1);

    assert_eq!(store.owned_persons.clear_reference("position_id", position.id).await?, 1);
    assert_eq!(store.owned_persons.select_404(owned.id).await?.position_id, None);

    assert!(store.owned_persons.delete(owned.id).await?);
    assert!(store.persons.delete(person.id).await?);
    assert!(store.positions.delete(position.id).await?);
    assert!(store.teams.delete(team.id).await?);
    assert!(matches!(store.teams.select_404(team.id).await, Err(DatabaseError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn accounts_permissions_and_sessions() -> Result<()> {
    let Some(store) = postgres_store().await? else { return Ok(()) };
    let accounts = &store.accounts;

    let username = unique("carol");
    let new_user = || NewUser {
        username: username.clone(),
        password_hash: "$argon2id$placeholder".into(),
        is_superuser: true,
    };
    let carol = accounts.create_user(new_user()).await?;
    assert!(carol.is_active);
    assert!(carol.is_superuser);
    assert!(matches!(accounts.create_user(new_user()).await, Err(DatabaseError::Conflict(_))));

    accounts.grant(carol.id, Permission::DeleteTeam).await?;
    accounts.grant(carol.id, Permission::DeleteTeam).await?;
    assert_eq!(
        accounts.permissions(carol.id).await?.into_iter().collect::<Vec<_>>(),
        vec![Permission::DeleteTeam]
    );
    assert!(accounts.revoke(carol.id, Permission::DeleteTeam).await?);
    assert!(accounts.permissions(carol.id).await?.is_empty());

    assert!(accounts.set_active(carol.id, false).await?);
    let found = accounts.find_user_by_username(&username).await?.expect("user exists");
    assert!(!found.is_active);

    let now = Utc::now();
    let (live, stale) = (unique("live"), unique("stale"));
    for (digest, offset) in [(&live, 1), (&stale, -1)] {
        accounts
            .create_session(Session { key_digest: digest.clone(), user_id: carol.id, expires_at: now + Duration::hours(offset) })
            .await?;
    }
    assert!(accounts.purge_expired_sessions().await? >= 1);
    assert!(accounts.find_session(&stale).await?.is_none());
    let session = accounts.find_session(&live).await?.expect("live session kept");
    assert_eq!(session.user_id, carol.id);
    assert!(accounts.delete_session(&live).await?);
    Ok(())
}
