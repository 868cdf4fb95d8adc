//! HMI Common Library
//!
//! This crate provides the shared vocabulary of the HMI tag exchange: layout
//! constants, the tag value model, the tag schema with its region layout and
//! configuration loading utilities.
//!
//! # Module Structure
//!
//! - [`consts`] - Region layout constants
//! - [`value`] - Tag types, tag values and coercion
//! - [`schema`] - Tag descriptors, de-duplication and slot layout
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use hmi_common::prelude::*;
//!
//! let specs = vec![
//!     TagSpec::new(1, "run", TagType::Bool),
//!     TagSpec::new(2, "speed", TagType::Float32),
//! ];
//! let schema = VariableSchema::from_specs("/hmi_tags", &specs);
//! assert_eq!(schema.layout(false)?.total_size, 4 + 1 + 4 + 4);
//! # Ok::<(), hmi_common::schema::LayoutOverflow>(())
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod schema;
pub mod value;
