//! Typed storage cell: one value of type `T` under a fixed key.

use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use crate::codec::{Codec, CodecError, JsonCodec};
use crate::kv::{KeyValueStore, StoreError};
use crate::options::CookieOptions;

#[derive(Debug, Error)]
pub enum CellError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub struct ScopedCell<T, C = JsonCodec> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    options: CookieOptions,
    codec: C,
    _value: PhantomData<fn() -> T>,
}

impl<T> ScopedCell<T, JsonCodec>
where
    JsonCodec: Codec<T>,
{
    pub fn json(store: Arc<dyn KeyValueStore>, key: impl Into<String>, options: CookieOptions) -> Self {
        Self::new(store, key, options, JsonCodec)
    }
}

impl<T, C> ScopedCell<T, C>
where
    C: Codec<T>,
{
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        options: CookieOptions,
        codec: C,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            options,
            codec,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load(&self) -> Result<Option<T>, CellError> {
        match self.store.get(&self.key)? {
            Some(raw) => Ok(Some(self.codec.decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, value: &T) -> Result<(), CellError> {
        let raw = self.codec.encode(value)?;
        self.store.set(&self.key, &raw, &self.options)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CellError> {
        self.store.remove(&self.key)?;
        Ok(())
    }
}

impl<T, C> core::fmt::Debug for ScopedCell<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopedCell")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
