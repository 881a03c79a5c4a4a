//! Audit engine wiring: configuration, context capture and unit-of-work entry

use std::sync::Arc;

use tracing::info;

use crate::config::AuditConfig;
use crate::context::ContextProvider;
use crate::database::DatabaseManager;
use crate::error::Result;
use crate::query::AuditReader;
use crate::recorder::UnitOfWork;
use crate::sequencer::RevisionSequencer;

/// Entry point to the audit layer.
///
/// Owns the database pool, the revision sequencer and the injected context
/// provider; hands out [`UnitOfWork`]s for the write path and [`AuditReader`]s
/// for the query surface.
pub struct AuditEngine {
    db: DatabaseManager,
    sequencer: RevisionSequencer,
    context: Arc<dyn ContextProvider>,
}

impl AuditEngine {
    /// Connect to the backing store, apply migrations and wire the engine
    pub async fn connect(config: AuditConfig, context: Arc<dyn ContextProvider>) -> Result<Self> {
        let db = DatabaseManager::new(&config).await?;
        let sequencer = RevisionSequencer::new(db.connection_arc());
        info!("Audit engine ready");
        Ok(Self {
            db,
            sequencer,
            context,
        })
    }

    /// Open a unit of work: allocate its revision id and capture context once
    pub async fn begin(&self) -> Result<UnitOfWork> {
        self.open(None).await
    }

    /// Open a unit of work whose revision carries an action label
    pub async fn begin_labeled(&self, action_label: impl Into<String>) -> Result<UnitOfWork> {
        self.open(Some(action_label.into())).await
    }

    /// Read surface over committed history
    pub fn reader(&self) -> AuditReader {
        AuditReader::new(self.db.connection_arc())
    }

    /// Get a handle to the database manager
    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    async fn open(&self, action_label: Option<String>) -> Result<UnitOfWork> {
        // Allocate before the transaction opens so a rollback burns the id
        let revision_id = self.sequencer.allocate().await?;
        let actor = self.context.current_actor();
        let origin = self.context.current_origin();
        let txn = self.db.begin_transaction().await?;
        Ok(UnitOfWork::new(txn, revision_id, actor, origin, action_label))
    }
}
