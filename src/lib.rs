//! Data-access layer for the AlgoRef algorithm catalog.
//!
//! - [`cache`]: request cache with tag-based invalidation
//! - [`query`]: debounced search/filter/pagination controller
//! - [`session`]: credential storage and the session guard
//! - [`mutation`]: admin writes and the invalidations they trigger
//! - [`api`]: REST client and typed catalog reads

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod mutation;
pub mod query;
pub mod session;

pub use algoref_api_types as types;
