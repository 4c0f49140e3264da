//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel ORM
//! - **memory**: process-local repositories for development and tests
//! - **mail**: HTTP mail relay and a logging fallback
//! - **password**: Argon2id password hashing
//!
//! Adapters translate between domain types and infrastructure
//! representations and contain no workflow logic.

pub mod mail;
pub mod memory;
pub mod password;
pub mod persistence;
