//! nudge-core - Core library for Nudge
//!
//! This crate contains the models, local cache, sync engine, and optimistic
//! mutation layer shared by every Nudge client surface.

pub mod api;
pub mod config;
pub mod db;
pub mod due;
pub mod error;
pub mod models;
pub mod optimistic;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;
pub mod views;

pub use error::{Error, Result};
pub use models::{List, ListId, Reminder, ReminderId};
