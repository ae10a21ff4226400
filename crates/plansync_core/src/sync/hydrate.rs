//! Snapshot hydration from the remote store.

use crate::model::snapshot::Snapshot;
use crate::sync::remote::{RemoteResult, RemoteRow, RemoteStore, RemoteTable};
use crate::sync::rows::{from_row, ProfileRow, SyncRecord};
use log::{info, warn};

/// Loads every table for `account_id` into one snapshot.
///
/// Returns `Ok(None)` when the account has no remote rows at all. Rows that
/// fail to decode are skipped with a warning.
pub async fn load_remote_snapshot(
    remote: &dyn RemoteStore,
    account_id: &str,
) -> RemoteResult<Option<Snapshot>> {
    let mut snapshot = Snapshot::default();
    let mut total_rows = 0usize;

    let profiles = remote.select_all(RemoteTable::Profiles, account_id).await?;
    total_rows += profiles.len();
    if let Some(row) = decode_rows::<ProfileRow>(&profiles)
        .into_iter()
        .find(|row| row.id == account_id)
    {
        snapshot.profile = row.profile;
        snapshot.settings = row.settings;
    }

    snapshot.items = fetch(remote, account_id, &mut total_rows).await?;
    snapshot.habits = fetch(remote, account_id, &mut total_rows).await?;
    snapshot.habit_logs = fetch(remote, account_id, &mut total_rows).await?;
    snapshot.goals = fetch(remote, account_id, &mut total_rows).await?;
    snapshot.reflections = fetch(remote, account_id, &mut total_rows).await?;
    snapshot.life_area_scores = fetch(remote, account_id, &mut total_rows).await?;
    snapshot.messages = fetch(remote, account_id, &mut total_rows).await?;

    if total_rows == 0 {
        info!("event=remote_hydrate module=sync status=empty account_id={account_id}");
        return Ok(None);
    }

    snapshot
        .items
        .sort_by_key(|item| (item.scheduled_date, item.order_index));
    snapshot.habits.sort_by_key(|habit| habit.order_index);
    snapshot.messages.sort_by_key(|message| message.created_at_ms);

    info!(
        "event=remote_hydrate module=sync status=ok account_id={account_id} rows={total_rows} items={}",
        snapshot.items.len()
    );
    Ok(Some(snapshot))
}

async fn fetch<T: SyncRecord>(
    remote: &dyn RemoteStore,
    account_id: &str,
    total_rows: &mut usize,
) -> RemoteResult<Vec<T>> {
    let rows = remote.select_all(T::TABLE, account_id).await?;
    *total_rows += rows.len();
    Ok(decode_rows(&rows))
}

fn decode_rows<T: SyncRecord>(rows: &[RemoteRow]) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match from_row::<T>(row) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    "event=remote_decode module=sync status=skipped table={} id={} error={err}",
                    T::TABLE,
                    row.get("id").and_then(|value| value.as_str()).unwrap_or("?")
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::load_remote_snapshot;
    use crate::model::snapshot::Snapshot;
    use crate::sync::reconcile::reconcile;
    use crate::sync::remote::{InMemoryRemoteStore, RemoteStore, RemoteTable};
    use serde_json::json;

    #[tokio::test]
    async fn empty_account_yields_none() {
        let remote = InMemoryRemoteStore::new();
        assert!(load_remote_snapshot(&remote, "acct").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pushed_snapshot_loads_back_and_skips_bad_rows() {
        let remote = InMemoryRemoteStore::new();
        let seeded = Snapshot::seeded();
        for (table, changes) in reconcile(&Snapshot::default(), &seeded, "acct").into_tables() {
            remote.upsert_many(table, changes.upserts).await.unwrap();
        }
        let mut broken = serde_json::Map::new();
        broken.insert("id".to_string(), json!("broken"));
        broken.insert("user_id".to_string(), json!("acct"));
        remote
            .upsert_many(RemoteTable::Items, vec![broken])
            .await
            .unwrap();

        let loaded = load_remote_snapshot(&remote, "acct").await.unwrap().unwrap();
        assert_eq!(loaded, seeded);
        assert!(load_remote_snapshot(&remote, "someone-else")
            .await
            .unwrap()
            .is_none());
    }
}
