//! Destination workspace: transport, wire types, the property codec, the
//! relation resolver, and the per-run session.

pub mod client;
pub mod models;
pub mod property;
pub mod resolver;
pub mod session;

pub use client::NotionClient;
pub use property::{FieldValue, PropertyKind, PropertyValue};
pub use resolver::RelationResolver;
pub use session::Workspace;
