//! Core types and error handling shared by every dalec-assist module.

pub mod error;

pub use error::{DalecError, ErrorContext, user_friendly_error};
