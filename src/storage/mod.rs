//! Storage module
//!
//! SQLite persistence for riders, season windows, and attempts.

pub mod attempts;
pub mod database;
pub mod schema;
pub mod windows;

pub use database::{Database, DatabaseError, Rider};
