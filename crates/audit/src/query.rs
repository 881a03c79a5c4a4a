//! Read surface: revision histories, point-in-time reconstruction and diffs

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;

use crate::entity::{revisions, snapshots};
use crate::error::{AuditError, Result};
use crate::recorder::{ChangeType, FieldMap};

/// One field-level change between two consecutive snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
}

/// One entry of an entity's revision history, in the collaborator-facing shape
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub revision_number: i64,
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub ip_address: String,
    /// INSERT, UPDATE or DELETE
    pub revision_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,
    pub entity_data: FieldMap,
    pub changes: Vec<FieldChange>,
}

/// Metadata of one committed revision
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_number: i64,
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub ip_address: String,
    pub action_label: Option<String>,
}

/// One entity touched by a revision
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRef {
    pub entity_type: String,
    pub entity_id: String,
    pub change_type: ChangeType,
}

/// Query service over committed audit history.
///
/// Every call re-reads committed state, so sequences are finite, restartable
/// and never observe a partially committed unit of work.
#[derive(Clone)]
pub struct AuditReader {
    conn: Arc<DatabaseConnection>,
}

impl AuditReader {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Full revision history of one entity, ascending, with per-entry diffs
    pub async fn get_history(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<HistoryEntry>> {
        let rows = snapshots::Entity::find()
            .filter(snapshots::Column::EntityType.eq(entity_type))
            .filter(snapshots::Column::EntityId.eq(entity_id))
            .order_by_asc(snapshots::Column::RevisionId)
            .find_also_related(revisions::Entity)
            .all(self.conn.as_ref())
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        let mut previous: Option<FieldMap> = None;
        for (snapshot, revision) in rows {
            let entry = build_entry(snapshot, revision, previous.as_ref())?;
            previous = Some(entry.entity_data.clone());
            entries.push(entry);
        }
        Ok(entries)
    }

    /// One page of history, oldest first, with the total entry count.
    ///
    /// Lets callers walk long histories without materializing full payloads;
    /// the diff at a page boundary is computed against the snapshot preceding
    /// the page.
    pub async fn get_history_page(
        &self,
        entity_type: &str,
        entity_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<HistoryEntry>, u64)> {
        if page_size == 0 {
            return Err(AuditError::InvalidInput(
                "page_size must be positive".to_string(),
            ));
        }

        let paginator = snapshots::Entity::find()
            .filter(snapshots::Column::EntityType.eq(entity_type))
            .filter(snapshots::Column::EntityId.eq(entity_id))
            .order_by_asc(snapshots::Column::RevisionId)
            .find_also_related(revisions::Entity)
            .paginate(self.conn.as_ref(), page_size);

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page).await?;

        let mut previous = if page == 0 {
            None
        } else {
            snapshots::Entity::find()
                .filter(snapshots::Column::EntityType.eq(entity_type))
                .filter(snapshots::Column::EntityId.eq(entity_id))
                .order_by_asc(snapshots::Column::RevisionId)
                .offset(page * page_size - 1)
                .one(self.conn.as_ref())
                .await?
                .map(|s| field_map(s.fields))
                .transpose()?
        };

        let mut entries = Vec::with_capacity(rows.len());
        for (snapshot, revision) in rows {
            let entry = build_entry(snapshot, revision, previous.as_ref())?;
            previous = Some(entry.entity_data.clone());
            entries.push(entry);
        }
        Ok((entries, total))
    }

    /// Revision ids at which the entity was touched, ascending
    pub async fn get_revision_numbers(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<i64>> {
        let numbers = snapshots::Entity::find()
            .select_only()
            .column(snapshots::Column::RevisionId)
            .filter(snapshots::Column::EntityType.eq(entity_type))
            .filter(snapshots::Column::EntityId.eq(entity_id))
            .order_by_asc(snapshots::Column::RevisionId)
            .into_tuple::<i64>()
            .all(self.conn.as_ref())
            .await?;
        Ok(numbers)
    }

    /// Reconstruct the entity state as of the given revision: the fields of
    /// the snapshot with the largest revision id not greater than the target.
    ///
    /// NotFound when the entity did not yet exist at that point, or when the
    /// applicable snapshot is a removal tombstone — `get_history` reports the
    /// tombstone entry for callers that need it.
    pub async fn get_entity_at_revision(
        &self,
        entity_type: &str,
        entity_id: &str,
        revision_number: i64,
    ) -> Result<FieldMap> {
        let snapshot = snapshots::Entity::find()
            .filter(snapshots::Column::EntityType.eq(entity_type))
            .filter(snapshots::Column::EntityId.eq(entity_id))
            .filter(snapshots::Column::RevisionId.lte(revision_number))
            .order_by_desc(snapshots::Column::RevisionId)
            .one(self.conn.as_ref())
            .await?
            .ok_or_else(|| {
                AuditError::NotFound(format!(
                    "{}/{} does not exist at revision {}",
                    entity_type, entity_id, revision_number
                ))
            })?;

        if snapshot.change_type == ChangeType::Removed.as_str() {
            return Err(AuditError::NotFound(format!(
                "{}/{} is removed as of revision {}",
                entity_type, entity_id, snapshot.revision_id
            )));
        }

        field_map(snapshot.fields)
    }

    /// Metadata of one revision, if it committed
    pub async fn get_revision(&self, revision_number: i64) -> Result<Option<RevisionInfo>> {
        Ok(revisions::Entity::find_by_id(revision_number)
            .one(self.conn.as_ref())
            .await?
            .map(|r| RevisionInfo {
                revision_number: r.id,
                timestamp: r.created_at,
                username: r.actor,
                ip_address: r.origin_address,
                action_label: r.action_label,
            }))
    }

    /// Every entity touched in one revision, in recording order
    pub async fn get_revision_contents(&self, revision_number: i64) -> Result<Vec<SnapshotRef>> {
        let rows = snapshots::Entity::find()
            .filter(snapshots::Column::RevisionId.eq(revision_number))
            .order_by_asc(snapshots::Column::Id)
            .all(self.conn.as_ref())
            .await?;

        rows.into_iter()
            .map(|s| {
                let change_type = ChangeType::parse(&s.change_type)?;
                Ok(SnapshotRef {
                    entity_type: s.entity_type,
                    entity_id: s.entity_id,
                    change_type,
                })
            })
            .collect()
    }
}

fn build_entry(
    snapshot: snapshots::Model,
    revision: Option<revisions::Model>,
    previous: Option<&FieldMap>,
) -> Result<HistoryEntry> {
    let revision = revision.ok_or_else(|| {
        anyhow!(
            "revision {} missing for snapshot of {}/{}",
            snapshot.revision_id,
            snapshot.entity_type,
            snapshot.entity_id
        )
    })?;
    let change_type = ChangeType::parse(&snapshot.change_type)?;
    let entity_data = field_map(snapshot.fields)?;
    let changes = match change_type {
        // A lifeline starts from nothing, so there is nothing to diff against
        ChangeType::Created => Vec::new(),
        _ => diff_fields(previous, &entity_data),
    };
    Ok(HistoryEntry {
        revision_number: snapshot.revision_id,
        timestamp: revision.created_at,
        username: revision.actor,
        ip_address: revision.origin_address,
        revision_type: change_type.revision_label().to_string(),
        action_label: revision.action_label,
        entity_data,
        changes,
    })
}

fn field_map(value: serde_json::Value) -> Result<FieldMap> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(anyhow!("snapshot fields are not an object").into()),
    }
}

/// Field-level delta between two consecutive field sets.
///
/// A field appears in the result iff its serialized value differs, including
/// fields appearing or disappearing; ordering follows the previous set, then
/// fields new in the current set.
pub fn diff_fields(previous: Option<&FieldMap>, current: &FieldMap) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let Some(previous) = previous else {
        for (field, new_value) in current {
            changes.push(FieldChange {
                field: field.clone(),
                old_value: None,
                new_value: Some(new_value.clone()),
            });
        }
        return changes;
    };

    for (field, old_value) in previous {
        match current.get(field) {
            Some(new_value) if new_value == old_value => {}
            new_value => changes.push(FieldChange {
                field: field.clone(),
                old_value: Some(old_value.clone()),
                new_value: new_value.cloned(),
            }),
        }
    }
    for (field, new_value) in current {
        if !previous.contains_key(field) {
            changes.push(FieldChange {
                field: field.clone(),
                old_value: None,
                new_value: Some(new_value.clone()),
            });
        }
    }
    changes
}
