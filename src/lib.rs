//! Offline reader core for serialized fiction: chapter storage and ordering,
//! estimated pagination, debounced reading-position persistence and
//! next/previous chapter navigation.

pub mod chapter;
pub mod config;
pub mod error;
pub mod library;
pub mod navigation;
pub mod pagination;
pub mod position;
pub mod prefs;
pub mod session;
pub mod store;

pub use error::{ReaderError, Result};
