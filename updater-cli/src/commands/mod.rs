//! Command handlers.

pub mod publish;
