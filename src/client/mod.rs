//! # Collaborator Interfaces
//!
//! Traits through which the distributor reaches workers, the element
//! workspace and its durable stores. Concrete implementations live in
//! [`crate::storage`]; the worker transport is supplied by the embedding
//! application.

pub mod traits;

pub use traits::{
    CheckpointStore, ElementSource, LineStream, ProcessMetadataStore, RegistryStore,
    WorkerClient, WorkerClientFactory,
};
