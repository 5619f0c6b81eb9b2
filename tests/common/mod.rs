//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.

mod constants;
mod fixtures;
mod flaky_store;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{open_backing_store, populate_catalog, tagged_item, EventLog};
#[allow(unused_imports)]
pub use flaky_store::FlakyStore;
