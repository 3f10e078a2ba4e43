//! `assist-store`: scoped key-value persistence for the Assist client.
//!
//! The stores mimic a browser cookie jar: string values under string keys,
//! written with [`CookieOptions`] and silently gone once expired. Typed
//! access goes through [`ScopedCell`] and an explicit [`Codec`].

pub mod cell;
pub mod codec;
pub mod file;
pub mod kv;
pub mod memory;
pub mod options;

pub use cell::{CellError, ScopedCell};
pub use codec::{Codec, CodecError, JsonCodec};
pub use file::FileStore;
pub use kv::{KeyValueStore, StoreError, StoredEntry};
pub use memory::InMemoryStore;
pub use options::{CookieOptions, SameSite};
