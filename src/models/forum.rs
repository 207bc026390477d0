use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Forums of this kind can hold topics. Categories and links cannot.
pub const KIND_FORUM: &str = "forum";
pub const KIND_CATEGORY: &str = "category";
pub const KIND_LINK: &str = "link";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "forums")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "String(StringLen::N(20))")]
    pub kind: String,
    pub sort_order: i32,
    pub topics_count: i32,
    pub posts_count: i32,
    pub last_post_on: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    pub fn accepts_topics(&self) -> bool {
        self.kind == KIND_FORUM
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::topic::Entity")]
    Topic,
    #[sea_orm(has_many = "super::forum_moderator::Entity")]
    ForumModerator,
}

impl Related<super::topic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Topic.def()
    }
}

impl Related<super::forum_moderator::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ForumModerator.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
