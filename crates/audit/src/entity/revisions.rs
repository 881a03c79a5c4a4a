//! revisions entity
//! One attributed, timestamped point in global history per committed unit of work

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "revisions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,  // Allocated by the revision sequencer
    pub created_at: DateTimeUtc,
    pub actor: String,  // Resolved identity, "anonymous" when none
    pub origin_address: String,  // First hop of the origin chain, "unknown" when none
    #[sea_orm(column_type = "Text", nullable)]
    pub action_label: Option<String>,  // Optional operation name supplied by the caller
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::snapshots::Entity")]
    Snapshots,
}

impl Related<super::snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
