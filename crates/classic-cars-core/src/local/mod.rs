//! Demo-mode record store.
//!
//! When the catalog API is unreachable the client keeps working against an
//! independent copy of the records held in the key-value store. The store
//! mirrors the remote CRUD semantics, including identifier shape, so callers
//! only differ in where they route a mutation.

pub mod store;

pub use store::LocalStore;
