//! HTTP API handlers for mixreview-server

pub mod admin;
pub mod auth;
pub mod client;
pub mod extract;
pub mod health;
pub mod media;
pub mod settings;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use client::client_routes;
pub use health::health_routes;
pub use media::media_routes;
pub use settings::settings_routes;
