//! Create `pull_request_thread` table.
//!
//! One row per pull request that has a Slack thread; replies are posted under `slack_ts`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PullRequestThread::Table)
                    .if_not_exists()
                    .col(uuid(PullRequestThread::Id).primary_key())
                    .col(string_len(PullRequestThread::Repository, 255).not_null())
                    .col(big_integer(PullRequestThread::Number).not_null())
                    .col(string_len(PullRequestThread::SlackChannel, 255).not_null())
                    .col(string_len(PullRequestThread::SlackTs, 64).not_null())
                    .col(timestamp_with_time_zone(PullRequestThread::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PullRequestThread::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum PullRequestThread { Table, Id, Repository, Number, SlackChannel, SlackTs, CreatedAt }
