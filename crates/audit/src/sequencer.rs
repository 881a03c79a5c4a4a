//! Revision id allocation

use std::sync::Arc;

use anyhow::anyhow;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use tracing::debug;

use crate::entity::revision_seq;
use crate::error::Result;

/// Primary key of the single counter row, seeded by the schema migration
const COUNTER_ROW_ID: i32 = 1;

/// Allocates globally unique, strictly increasing revision ids.
///
/// Each allocation commits in its own short transaction, independent of the
/// caller's unit of work: a rolled-back unit of work leaves a gap in the id
/// space instead of returning its id to the pool. The row lock taken by the
/// bump serializes concurrent allocations.
#[derive(Clone)]
pub struct RevisionSequencer {
    db: Arc<DatabaseConnection>,
}

impl RevisionSequencer {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Allocate the next revision id
    pub async fn allocate(&self) -> Result<i64> {
        let txn = self.db.begin().await?;

        revision_seq::Entity::update_many()
            .col_expr(
                revision_seq::Column::NextId,
                Expr::col(revision_seq::Column::NextId).add(1),
            )
            .filter(revision_seq::Column::Id.eq(COUNTER_ROW_ID))
            .exec(&txn)
            .await?;

        let row = revision_seq::Entity::find_by_id(COUNTER_ROW_ID)
            .one(&txn)
            .await?
            .ok_or_else(|| anyhow!("revision counter row missing, migrations not applied"))?;

        txn.commit().await?;

        debug!("Allocated revision id {}", row.next_id);
        Ok(row.next_id)
    }
}
