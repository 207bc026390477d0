pub mod cookie;
pub mod jwt;
pub mod slug;

pub use jwt::encode_access_token;
