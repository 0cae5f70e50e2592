//! Application services layer.

pub mod analytics;
pub mod auth;
pub mod error;
pub mod events;
pub mod locations;
pub mod mutation;
pub mod repos;
