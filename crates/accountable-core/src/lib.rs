//! # accountable-core
//!
//! Core types shared across the Accountable crates.
//!
//! This crate provides:
//! - Actor identity passed explicitly into every lifecycle call
//! - Stamp roles (`created_by`, `updated_by`, `deleted_by`) and the
//!   `StampSet` capability descriptor a record type declares
//! - Lifecycle event and delete mode enums used by observers
//! - Cross-cutting error types

pub mod capability;
pub mod enums;
pub mod errors;
pub mod identity;

pub use capability::StampSet;
pub use enums::{DeleteMode, LifecycleEvent, StampRole};
pub use errors::CoreError;
pub use identity::{Actor, ActorId, AsActorId};
