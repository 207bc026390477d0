use crate::{
    error::{AppError, AppResult},
    models::{
        forum_moderator,
        user::{self, ROLE_ADMIN, ROLE_BANNED, ROLE_USER},
        User, UserModel,
    },
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait};

pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<UserModel> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create(&self, username: &str, role: &str) -> AppResult<UserModel> {
        if ![ROLE_USER, ROLE_ADMIN, ROLE_BANNED].contains(&role) {
            return Err(AppError::Validation(format!("Invalid role '{}'", role)));
        }

        let now = chrono::Utc::now().naive_utc();
        let new_user = user::ActiveModel {
            username: sea_orm::ActiveValue::Set(username.to_string()),
            role: sea_orm::ActiveValue::Set(role.to_string()),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        Ok(new_user.insert(&self.db).await?)
    }

    /// Grants `user_id` moderation rights on `forum_id`.
    pub async fn add_moderator(&self, forum_id: i32, user_id: i32) -> AppResult<()> {
        let row = forum_moderator::ActiveModel {
            forum_id: sea_orm::ActiveValue::Set(forum_id),
            user_id: sea_orm::ActiveValue::Set(user_id),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };
        row.insert(&self.db).await?;
        Ok(())
    }
}
