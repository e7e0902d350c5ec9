//! The cart store and where its snapshots are kept.
//!
//! [`CartStore`] is the single writer of the cart. Every mutation updates the
//! in-memory cart, publishes the new snapshot to subscribers, then writes the
//! whole snapshot to a [`CartStorage`].

mod storage;
mod store;

pub use storage::{
    CART_STORAGE_KEY, CartBackend, CartStorage, CartStorageError, FileCartStorage,
    MemoryCartStorage,
};
pub use store::CartStore;
