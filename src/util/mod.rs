//! Utility modules for jarwright
//!
//! This module provides structured logging setup and configuration.

pub mod logging;

pub use logging::{init_default, init_for_session, init_from_env, init_logging, LoggingConfig};
