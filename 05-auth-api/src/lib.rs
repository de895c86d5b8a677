// Library crate exposing the application modules so integration tests and the binary share code.
pub mod config;
pub mod database;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod server;
