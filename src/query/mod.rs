//! Query controller.
//!
//! Turns user-editable filters into canonical list query parameters, with a
//! debounced search box and page reset on filter changes.

mod controller;
mod filter;
mod params;
mod timer;

pub use controller::{DEFAULT_DEBOUNCE_MS, QueryConfig, QueryController};
pub use filter::{DEFAULT_PAGE_SIZE, FilterPatch, FilterState, MAX_PAGE_SIZE};
pub use params::{QueryParams, to_query_params};
pub use timer::Debouncer;
