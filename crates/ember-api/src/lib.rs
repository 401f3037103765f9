pub mod admin;
pub mod auth;
pub mod comments;
pub mod middleware;
pub mod posts;
pub mod streaks;
