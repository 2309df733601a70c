pub mod admin;
pub mod attendance;
pub mod auth;
pub mod complaints;
pub mod dates;
pub mod error;
pub mod menus;
pub mod middleware;
pub mod notifications;
pub mod ratings;
pub mod response;
