//! UI components.

pub mod topology;
