// Adapters layer: concrete implementations of the domain ports.

pub mod hasher;
pub mod local_store;

pub use hasher::Argon2Hasher;
pub use local_store::LocalStore;
