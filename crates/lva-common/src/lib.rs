//! LVA common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the LVA crates:
//! - User and cluster identity types
//! - Action histories, interval sequences, and training examples
//! - Common error types

pub mod error;
pub mod history;
pub mod id;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use history::{ActionHistory, IntervalSequence, Outcome, TrainingExample, UserHistory};
pub use id::{ClusterId, UserId};
