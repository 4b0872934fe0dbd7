pub mod config;
pub mod db;
pub mod i18n;
pub mod schema;
pub mod security;
pub mod server;
pub mod service;
