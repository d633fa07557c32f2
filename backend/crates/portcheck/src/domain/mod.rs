//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (ProbeRequest, ProbeOutcome, AuditRecord)
//! - Domain value objects (Port, ClientId)
//! - The restricted port table (disclosure policy)
//! - Collaborator traits (prober, audit log)

pub mod entities;
pub mod repository;
pub mod restricted_ports;
pub mod value_objects;
