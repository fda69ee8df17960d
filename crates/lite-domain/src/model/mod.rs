//! Domain Model
//!
//! The only thing the repositories know about an entity is its identity.

pub mod identifiable;
