// Storage for the quote-channel registry.

pub mod json_binding_store;

pub use json_binding_store::JsonBindingStore;
