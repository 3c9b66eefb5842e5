//! Storage layer.
//!
//! Services depend on the [`MemeRepository`] and [`SettingsStore`] traits;
//! [`SqliteStore`] implements both over a single database file.

// Dropping the connection guard slightly earlier buys nothing here.
#![allow(clippy::significant_drop_tightening)]

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{MemeRepository, SettingsStore};
