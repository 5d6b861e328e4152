pub mod calendar;
pub mod config;
pub mod douban;
pub mod error;
pub mod notion;
pub mod retry;
pub mod sync;

pub use error::{Result, SyncError};
