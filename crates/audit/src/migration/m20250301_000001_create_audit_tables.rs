use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Revisions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Revisions::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Revisions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Revisions::Actor).string().not_null())
                    .col(ColumnDef::new(Revisions::OriginAddress).string().not_null())
                    .col(ColumnDef::new(Revisions::ActionLabel).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Snapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Snapshots::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Snapshots::RevisionId).big_integer().not_null())
                    .col(ColumnDef::new(Snapshots::EntityType).string().not_null())
                    .col(ColumnDef::new(Snapshots::EntityId).string().not_null())
                    .col(ColumnDef::new(Snapshots::ChangeType).string().not_null())
                    .col(ColumnDef::new(Snapshots::Fields).json().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_snapshots_revision")
                            .from(Snapshots::Table, Snapshots::RevisionId)
                            .to(Revisions::Table, Revisions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One snapshot per entity per revision; lifeline reads walk this key
        manager
            .create_index(
                Index::create()
                    .name("uq_snapshots_lifeline")
                    .table(Snapshots::Table)
                    .col(Snapshots::EntityType)
                    .col(Snapshots::EntityId)
                    .col(Snapshots::RevisionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_snapshots_revision")
                    .table(Snapshots::Table)
                    .col(Snapshots::RevisionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RevisionSeq::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RevisionSeq::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RevisionSeq::NextId).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Seed the single counter row so allocation is a plain bump
        manager
            .get_connection()
            .execute_unprepared("INSERT INTO revision_seq (id, next_id) VALUES (1, 0)")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Snapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Revisions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RevisionSeq::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Revisions {
    Table,
    Id,
    CreatedAt,
    Actor,
    OriginAddress,
    ActionLabel,
}

#[derive(DeriveIden)]
enum Snapshots {
    Table,
    Id,
    RevisionId,
    EntityType,
    EntityId,
    ChangeType,
    Fields,
}

#[derive(DeriveIden)]
enum RevisionSeq {
    Table,
    Id,
    NextId,
}
