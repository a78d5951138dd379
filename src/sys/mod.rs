//! System Definitions.
//!
//! Tipos fundamentais e códigos de erro compartilhados por scheduler,
//! IPC e mutex.

pub mod error;
pub mod types;

pub use error::{SchedError, SchedResult};
pub use types::{Priority, Tid};
