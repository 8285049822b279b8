//! # opcall
//!
//! Runtime for declaratively-described HTTP API operations: invoke an
//! operation by name and get its response cached and reshaped
//! automatically.
//!
//! ## Overview
//!
//! A caller hands over an already-resolved [`EndpointDescriptor`] (the
//! config layer owns discovery and parsing) plus raw parameters. The
//! runtime classifies the parameters into path/query/header/body slots,
//! consults a content-addressed TTL cache, delegates to the HTTP
//! transport on a miss, reshapes the decoded response through the
//! declared transform steps, and stores the post-transform result so
//! live and cached responses are always identical in shape.
//!
//! ## Core Philosophy
//!
//! - **Declarative**: behavior is configured through descriptors, not code
//! - **Result-Driven**: every boundary returns a discriminated outcome;
//!   callers never need exception handling to interpret one
//! - **Good Citizen**: one request in flight at a time, batches run
//!   strictly sequentially against rate-limited upstream APIs
//! - **Cache-Safe**: caching can never fail an otherwise-successful call
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Descriptor types consumed by the core (serde) |
//! | [`params`] | Parameter layer merging and resolution |
//! | [`cache`] | Key generation and the file-backed TTL store |
//! | [`transform`] | Ordered extract/rename response reshaping |
//! | [`transport`] | `Transport` trait and the reqwest implementation |
//! | [`auth`] | Credential lookup and request authentication |
//! | [`executor`] | Single-call orchestration (`RequestExecutor`) |
//! | [`batch`] | Sequential batch orchestration with fail-fast |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opcall::{CacheConfig, FileCacheStore, HttpTransport, ParamHints, RequestExecutor};
//! use std::sync::Arc;
//!
//! # async fn run(config: opcall::ConfigSet) -> opcall::Result<()> {
//! let (service, endpoint, defaults) = config.lookup("github.repos")?;
//!
//! let cache = FileCacheStore::new("/tmp/opcall-cache", CacheConfig::default())?;
//! let executor = RequestExecutor::new(Arc::new(HttpTransport::new()?), cache);
//!
//! let result = executor
//!     .execute(service, endpoint, &defaults, &ParamHints::default())
//!     .await;
//! println!("cached: {}", result.metadata.cached);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod params;
pub mod transform;
pub mod transport;

// Re-export main types for convenience
pub use batch::{BatchOptions, BatchOrchestrator, BatchReport};
pub use cache::{CacheConfig, CacheKey, CacheKeyGenerator, CacheStats, FileCacheStore};
pub use config::{
    AliasConfig, AuthConfig, ConfigSet, EndpointDescriptor, HttpMethod, ParamHints, ServiceConfig,
    TransformStep,
};
pub use error::Error;
pub use executor::{ApiError, ApiResult, RequestExecutor, ResultMetadata};
pub use params::{merge_layers, resolve as resolve_params, MappedRequest};
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
