use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One thread per (repository, number)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_thread_repository_number")
                    .table(PullRequestThread::Table)
                    .col(PullRequestThread::Repository)
                    .col(PullRequestThread::Number)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("uniq_thread_repository_number")
                    .table(PullRequestThread::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum PullRequestThread { Table, Repository, Number }
