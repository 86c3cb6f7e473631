// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Cardex Store
//!
//! Durable state and run orchestration for Cardex.
//!
//! This crate provides:
//!
//! - **PriceHistory**: Long-format history keyed on `(card_id, date)`
//! - **SnapshotStore**: CSV tables for the latest snapshot, dated archives, and history
//! - **HistoryLock**: Exclusive access to the history across concurrent runs
//! - **Config**: JSON configuration with defaults for every field
//! - **Pipeline**: One end-to-end run with injected HTTP, sleeper, and clock
//!
//! ## Usage
//!
//! ```ignore
//! use cardex_core::SystemClock;
//! use cardex_fetch::{ReqwestFetcher, TokioSleeper};
//! use cardex_store::{Config, Pipeline, PipelineSettings, SnapshotStore};
//! use std::sync::Arc;
//!
//! let config = Config::load()?;
//! let pipeline = Pipeline::new(
//!     Arc::new(ReqwestFetcher::with_options(config.timeout(), &config.api.user_agent)?),
//!     Arc::new(TokioSleeper),
//!     Arc::new(SystemClock),
//!     SnapshotStore::new(&config.storage.data_dir),
//!     PipelineSettings::from(&config),
//! );
//! let report = pipeline.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod lock;
pub mod persistence;
pub mod pipeline;

pub use config::{ApiConfig, Config, PipelineConfig, PriceConfig, RetryConfig, StorageConfig};
pub use error::StoreError;
pub use history::{PriceHistory, WideRow, WideView};
pub use lock::HistoryLock;
pub use persistence::SnapshotStore;
pub use pipeline::{Pipeline, PipelineError, PipelineSettings};
