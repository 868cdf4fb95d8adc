//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use hmi_common::prelude::*;` and get
//! the most important types without listing individual paths.

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, LockPolicy, RegionConfig, SharedConfig, TagExchangeConfig,
};

// ─── Tags ───────────────────────────────────────────────────────────
pub use crate::schema::{
    LayoutOverflow, RegionLayout, SlotLayout, TagDescriptor, TagSpec, VariableSchema,
    parse_tag_key, tag_key,
};
pub use crate::value::{TagType, TagValue, ValueError};
