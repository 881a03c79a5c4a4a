//! Unit-of-work write path: revision rows and entity snapshots

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{revisions, snapshots};
use crate::error::{AuditError, Result};

/// Ordered field-name → serialized value mapping of one tracked entity.
///
/// Insertion order is preserved end to end so diffs are deterministic.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Classifies the mutation that produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Created,
    Modified,
    Removed,
}

impl ChangeType {
    /// Storage tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Created => "CREATED",
            ChangeType::Modified => "MODIFIED",
            ChangeType::Removed => "REMOVED",
        }
    }

    /// Label used by the collaborator-facing history shape
    pub fn revision_label(&self) -> &'static str {
        match self {
            ChangeType::Created => "INSERT",
            ChangeType::Modified => "UPDATE",
            ChangeType::Removed => "DELETE",
        }
    }

    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "CREATED" => Ok(ChangeType::Created),
            "MODIFIED" => Ok(ChangeType::Modified),
            "REMOVED" => Ok(ChangeType::Removed),
            other => Err(AuditError::InvalidInput(format!(
                "unknown change type tag: {}",
                other
            ))),
        }
    }
}

/// One atomic group of tracked mutations sharing a single revision.
///
/// Obtained from [`AuditEngine::begin`](crate::engine::AuditEngine::begin).
/// Business writes run against [`transaction`](Self::transaction), every
/// tracked mutation is reported through [`record`](Self::record), and
/// [`commit`](Self::commit) makes the revision, its snapshots and the business
/// writes visible atomically. Dropping the unit of work without committing
/// rolls everything back.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
    id: Uuid,
    revision_id: i64,
    actor: String,
    origin: String,
    action_label: Option<String>,
    revision_written: bool,
    snapshot_count: usize,
}

impl UnitOfWork {
    pub(crate) fn new(
        txn: DatabaseTransaction,
        revision_id: i64,
        actor: String,
        origin: String,
        action_label: Option<String>,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(
            "Unit of work {} opened with revision id {} for {}@{}",
            id, revision_id, actor, origin
        );
        Self {
            txn,
            id,
            revision_id,
            actor,
            origin,
            action_label,
            revision_written: false,
            snapshot_count: 0,
        }
    }

    /// Revision id shared by every snapshot recorded in this unit of work
    pub fn revision_id(&self) -> i64 {
        self.revision_id
    }

    pub fn unit_of_work_id(&self) -> Uuid {
        self.id
    }

    /// Actor captured when the unit of work was opened
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Origin address captured when the unit of work was opened
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Underlying transaction, for the business writes this unit of work audits
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Label the revision with an operation name. Must be called before the
    /// first recorded snapshot, which persists the revision row.
    pub fn set_action_label(&mut self, label: impl Into<String>) -> Result<()> {
        if self.revision_written {
            return Err(AuditError::InvalidInput(
                "action label must be set before the first recorded snapshot".to_string(),
            ));
        }
        self.action_label = Some(label.into());
        Ok(())
    }

    /// Record the full field state of one tracked entity mutation.
    ///
    /// The first call persists the revision row; every call appends (or, for an
    /// entity already recorded in this unit of work, coalesces into) one
    /// snapshot tagged with this unit's revision id.
    pub async fn record(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        change_type: ChangeType,
        fields: FieldMap,
    ) -> Result<()> {
        self.ensure_revision_row().await?;

        let last = snapshots::Entity::find()
            .filter(snapshots::Column::EntityType.eq(entity_type))
            .filter(snapshots::Column::EntityId.eq(entity_id))
            .order_by_desc(snapshots::Column::RevisionId)
            .one(&self.txn)
            .await?;

        if let Some(last_row) = &last {
            if last_row.revision_id == self.revision_id {
                return self
                    .coalesce_pending(last_row.clone(), entity_type, entity_id, change_type, fields)
                    .await;
            }
        }

        let alive = matches!(&last, Some(s) if s.change_type != ChangeType::Removed.as_str());
        match change_type {
            ChangeType::Created if alive => {
                return Err(AuditError::InvalidInput(format!(
                    "{}/{} already exists at revision {}",
                    entity_type,
                    entity_id,
                    last.map(|s| s.revision_id).unwrap_or_default()
                )));
            }
            ChangeType::Modified | ChangeType::Removed if !alive => {
                return Err(AuditError::InvalidInput(format!(
                    "{}/{} has no live lifeline at revision {}",
                    entity_type, entity_id, self.revision_id
                )));
            }
            _ => {}
        }

        let snapshot = snapshots::ActiveModel {
            id: NotSet,
            revision_id: Set(self.revision_id),
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id.to_string()),
            change_type: Set(change_type.as_str().to_string()),
            fields: Set(serde_json::Value::Object(fields)),
        };
        snapshot.insert(&self.txn).await?;
        self.snapshot_count += 1;

        debug!(
            "Recorded {} snapshot for {}/{} at revision {}",
            change_type.as_str(),
            entity_type,
            entity_id,
            self.revision_id
        );
        Ok(())
    }

    /// Commit the business writes, the revision row and its snapshots atomically
    pub async fn commit(self) -> Result<()> {
        self.txn.commit().await?;
        info!(
            "Unit of work {} committed revision {} ({} snapshots)",
            self.id, self.revision_id, self.snapshot_count
        );
        Ok(())
    }

    /// Abort: nothing becomes visible and the allocated revision id is burned
    pub async fn rollback(self) -> Result<()> {
        self.txn.rollback().await?;
        debug!(
            "Unit of work {} rolled back, revision id {} burned",
            self.id, self.revision_id
        );
        Ok(())
    }

    async fn ensure_revision_row(&mut self) -> Result<()> {
        if self.revision_written {
            return Ok(());
        }
        let revision = revisions::ActiveModel {
            id: Set(self.revision_id),
            created_at: Set(Utc::now()),
            actor: Set(self.actor.clone()),
            origin_address: Set(self.origin.clone()),
            action_label: Set(self.action_label.clone()),
        };
        revision.insert(&self.txn).await?;
        self.revision_written = true;
        Ok(())
    }

    /// Fold a repeated report of the same entity into its pending snapshot,
    /// keeping one snapshot per entity per revision.
    async fn coalesce_pending(
        &mut self,
        pending: snapshots::Model,
        entity_type: &str,
        entity_id: &str,
        change_type: ChangeType,
        fields: FieldMap,
    ) -> Result<()> {
        let pending_type = ChangeType::parse(&pending.change_type)?;
        match (pending_type, change_type) {
            // Born and buried in the same unit of work: nothing to keep
            (ChangeType::Created, ChangeType::Removed) => {
                snapshots::Entity::delete_by_id(pending.id)
                    .exec(&self.txn)
                    .await?;
                self.snapshot_count -= 1;
                debug!(
                    "Dropped pending snapshot for {}/{}: created and removed in one unit of work",
                    entity_type, entity_id
                );
                Ok(())
            }
            (ChangeType::Created, ChangeType::Modified)
            | (ChangeType::Modified, ChangeType::Modified)
            | (ChangeType::Modified, ChangeType::Removed) => {
                let merged = if pending_type == ChangeType::Created {
                    ChangeType::Created
                } else {
                    change_type
                };
                let mut active: snapshots::ActiveModel = pending.into();
                active.change_type = Set(merged.as_str().to_string());
                active.fields = Set(serde_json::Value::Object(fields));
                active.update(&self.txn).await?;
                debug!(
                    "Coalesced {} snapshot for {}/{} at revision {}",
                    merged.as_str(),
                    entity_type,
                    entity_id,
                    self.revision_id
                );
                Ok(())
            }
            (ChangeType::Removed, _) => Err(AuditError::InvalidInput(format!(
                "{}/{} was removed earlier in this unit of work",
                entity_type, entity_id
            ))),
            (_, ChangeType::Created) => Err(AuditError::InvalidInput(format!(
                "{}/{} was already recorded in this unit of work",
                entity_type, entity_id
            ))),
        }
    }
}
