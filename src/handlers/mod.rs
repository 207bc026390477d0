pub mod flash;
pub mod forum;
pub mod moderation;
pub mod topic;
