pub mod forum;
pub mod forum_moderator;
pub mod topic;
pub mod user;

pub use forum::{Entity as Forum, Model as ForumModel};
pub use forum_moderator::Entity as ForumModerator;
pub use topic::{Entity as Topic, Model as TopicModel, TopicStatus};
pub use user::{Entity as User, Model as UserModel};
