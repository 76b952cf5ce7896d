// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "quotes/mod.rs"]
pub mod quotes;
