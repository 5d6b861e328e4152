//! Source service: the Douban mobile "interests" API.

pub mod client;
pub mod models;

pub use client::{fetch_all_interests, DoubanClient, InterestPager};
pub use models::{Interest, Subject, WatchStatus};
