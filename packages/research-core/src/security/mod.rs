//! Credential handling for outbound service calls.

pub mod credentials;

pub use credentials::{SecretString, ServiceEndpoint};
