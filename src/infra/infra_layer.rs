// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "quotes/mod.rs"]
pub mod quotes;
