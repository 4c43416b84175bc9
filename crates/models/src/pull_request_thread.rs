use chrono::Utc;
use sea_orm::{entity::prelude::*, sea_query::OnConflict, DatabaseConnection, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pull_request_thread")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub repository: String,
    pub number: i64,
    pub slack_channel: String,
    pub slack_ts: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_key(repository: &str, number: i64) -> Result<(), ModelError> {
    if repository.trim().is_empty() {
        return Err(ModelError::Validation("repository required".into()));
    }
    if repository.len() > 255 {
        return Err(ModelError::Validation("repository too long (<=255)".into()));
    }
    if number <= 0 {
        return Err(ModelError::Validation("pull request number must be positive".into()));
    }
    Ok(())
}

pub async fn find_by_key(
    db: &DatabaseConnection,
    repository: &str,
    number: i64,
) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::Repository.eq(repository))
        .filter(Column::Number.eq(number))
        .one(db)
        .await?)
}

/// Insert the thread, or move an existing one for the same pull request to the new ts.
pub async fn upsert(
    db: &DatabaseConnection,
    repository: &str,
    number: i64,
    slack_channel: &str,
    slack_ts: &str,
) -> Result<Model, ModelError> {
    validate_key(repository, number)?;
    if slack_ts.trim().is_empty() {
        return Err(ModelError::Validation("slack ts required".into()));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        repository: Set(repository.to_string()),
        number: Set(number),
        slack_channel: Set(slack_channel.to_string()),
        slack_ts: Set(slack_ts.to_string()),
        created_at: Set(Utc::now().into()),
    };
    let model = Entity::insert(am)
        .on_conflict(
            OnConflict::columns([Column::Repository, Column::Number])
                .update_columns([Column::SlackChannel, Column::SlackTs])
                .to_owned(),
        )
        .exec_with_returning(db)
        .await?;
    Ok(model)
}

pub async fn delete_by_key(db: &DatabaseConnection, repository: &str, number: i64) -> Result<u64, ModelError> {
    let res = Entity::delete_many()
        .filter(Column::Repository.eq(repository))
        .filter(Column::Number.eq(number))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
