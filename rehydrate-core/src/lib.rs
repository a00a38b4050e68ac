//! Core traits and types for the Rehydrate event-sourcing library.
//!
//! This crate provides the foundational abstractions for persisting and
//! reconstructing event-sourced aggregates:
//!
//! - [`aggregate`] - Aggregate capability (`Aggregate`, `Apply`, `Create`, `EventRecorder`)
//! - [`event`] - Event marker traits (`DomainEvent`, `EventKind`, `AggregateEvent`)
//! - [`envelope`] - Envelopes, event streams and aggregate histories
//! - [`wrapper`] - Conversion between recorded events and event streams (`EventWrapper`)
//! - [`factory`] - Identifier type → aggregate mapping (`AggregateFactory`)
//! - [`repository`] - Aggregate persistence orchestration (`Repository`)
//! - [`manager`] - Identity-mapped entry point (`AggregateManager`)
//! - [`store`] - Event persistence abstraction (`EventStore`)
//! - [`concurrency`] - Optimistic concurrency conflicts
//!
//! # Example
//!
//! ```
//! use rehydrate_core::{factory::AggregateFactory, repository::Repository, store::inmemory};
//!
//! // Create an in-memory store and repository
//! let store = inmemory::Store::new();
//! let repo = Repository::new(store, AggregateFactory::default());
//! ```
//!
//! Most users should depend on the `rehydrate` crate, which re-exports these
//! types together with the derive macros.

pub mod aggregate;
pub mod concurrency;
pub mod decorator;
pub mod envelope;
pub mod event;
pub mod factory;
pub mod id;
pub mod identity_map;
pub mod manager;
pub mod naming;
pub mod repository;
pub mod store;
pub mod wrapper;
