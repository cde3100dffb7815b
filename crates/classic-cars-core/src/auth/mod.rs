//! API key storage.
//!
//! Mutating API calls need a shared secret. It is kept in the OS keychain
//! via `CredentialStore`, with the environment and the config file as
//! alternatives.

pub mod credentials;

pub use credentials::{resolve_api_key, ApiKeySource, CredentialStore};
