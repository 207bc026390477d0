use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Lifecycle status of a topic, stored as a short string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Normal,
    Locked,
    Moved,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Normal => "normal",
            TopicStatus::Locked => "locked",
            TopicStatus::Moved => "moved",
        }
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(TopicStatus::Normal),
            "locked" => Ok(TopicStatus::Locked),
            "moved" => Ok(TopicStatus::Moved),
            other => Err(format!("unknown topic status '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "topics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub forum_id: i32,
    pub poster_id: Option<i32>,
    pub subject: String,
    pub slug: String,
    #[sea_orm(column_type = "String(StringLen::N(20))")]
    pub status: String,
    pub posts_count: i32,
    pub last_post_on: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    /// Unknown values read back from the database are treated as `Normal`.
    pub fn status(&self) -> TopicStatus {
        self.status.parse().unwrap_or(TopicStatus::Normal)
    }

    pub fn is_locked(&self) -> bool {
        self.status() == TopicStatus::Locked
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::forum::Entity",
        from = "Column::ForumId",
        to = "super::forum::Column::Id"
    )]
    Forum,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PosterId",
        to = "super::user::Column::Id"
    )]
    Poster,
}

impl Related<super::forum::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Forum.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poster.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
