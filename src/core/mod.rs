//! Core identifier and configuration-text types.

pub mod props;
pub mod types;

pub use props::{ConfigProps, PropsError};
pub use types::{ConfigId, JobKey, TriggerKey};
