pub mod auth;
pub mod discover;
pub mod error;
pub mod feed;
pub mod middleware;
pub mod notes;
pub mod users;

mod convert;
