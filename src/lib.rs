pub mod auth;
pub mod config;
pub mod content;
pub mod database;
pub mod entitlement;
pub mod error;
pub mod handlers;
pub mod permissions;
pub mod storage;
