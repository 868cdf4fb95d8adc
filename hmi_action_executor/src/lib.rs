//! # HMI Action Executor
//!
//! Interprets declarative action trees against the HMI tag space. A tree is
//! built from groups (serial or parallel), tag writes, waits, conditions on
//! tag values and navigation requests. Reads and writes go through a
//! [`TagValueProvider`], so the engine works the same over the shared tag
//! store, a remote API or a test double.
//!
//! ## Components
//!
//! - [`document`] - action document schema and the validated [`ActionTree`]
//! - [`compare`] - condition operators
//! - [`engine`] - [`ActionEngine`] with cancellation and [`RunReport`]
//! - [`provider`] - provider and navigator traits
//! - [`bridge`] - [`StoreProvider`] and [`OptimisticProvider`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hmi_action_executor::{ActionEngine, ActionTree, LoggingNavigator, StoreProvider};
//! use hmi_common::prelude::*;
//! use hmi_shared_memory::SharedVariableStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TagExchangeConfig::load(Path::new("tag_exchange.toml"))?;
//! let store = Arc::new(SharedVariableStore::from_config(&config)?);
//! let tree = ActionTree::load(Path::new("actions.json"))?;
//!
//! let engine = ActionEngine::new(
//!     Arc::new(StoreProvider::new(store)),
//!     Arc::new(LoggingNavigator),
//! );
//! let report = engine.execute(&tree).await;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod bridge;
pub mod compare;
pub mod document;
pub mod engine;
pub mod error;
pub mod provider;

pub use bridge::{LogRollback, OptimisticProvider, RollbackObserver, StoreProvider};
pub use document::{ActionDocument, ActionKind, ActionNode, ActionTree, NavigateKind};
pub use engine::{ActionEngine, NodeFailure, RunReport};
pub use error::{ActionError, DocumentError, DocumentResult, ProviderError};
pub use provider::{LoggingNavigator, Navigator, TagValueProvider};
