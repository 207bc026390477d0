pub mod cache;
pub mod forum;
pub mod moderation;
pub mod topic;
pub mod user;
