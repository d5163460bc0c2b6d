//! NTX index keys.
//!
//! A `KeyValue` is a fixed-capacity byte key with a declared length. Keys
//! are ordered byte-wise and only against keys of the same declared
//! length: numeric and date keys must already be encoded into
//! order-preserving bytes, and callers normalize key length before
//! inserting into any ordered structure.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{DbfError, Result};

/// Longest key an NTX index supports.
pub const NTX_MAX_KEY_LENGTH: usize = 256;

/// Fixed-length index key.
#[derive(Clone)]
pub struct KeyValue {
    value: [u8; NTX_MAX_KEY_LENGTH],
    length: usize,
}

impl KeyValue {
    /// Builds a key of `length` bytes, clamped to `NTX_MAX_KEY_LENGTH`.
    ///
    /// Without a source the key is zero-filled. A source longer than the
    /// clamped length is truncated; a shorter one is copied and the rest
    /// zero-filled.
    pub fn new(source: Option<&[u8]>, length: usize) -> Self {
        let length = length.min(NTX_MAX_KEY_LENGTH);
        let mut value = [0u8; NTX_MAX_KEY_LENGTH];
        if let Some(src) = source {
            let n = src.len().min(length);
            value[..n].copy_from_slice(&src[..n]);
        }
        Self { value, length }
    }

    /// Builds a key covering all of `bytes` (up to the maximum).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(Some(bytes), bytes.len())
    }

    /// A zero-filled key of `length` bytes.
    pub fn zeroed(length: usize) -> Self {
        Self::new(None, length)
    }

    /// Declared length.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The significant key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.value[..self.length]
    }

    /// Orders two keys of equal declared length byte-wise.
    ///
    /// # Errors
    /// `DbfError::LengthMismatch` whenever the declared lengths differ.
    pub fn compare(&self, other: &KeyValue) -> Result<Ordering> {
        if self.length != other.length {
            return Err(DbfError::LengthMismatch {
                left: self.length,
                right: other.length,
            });
        }
        Ok(self.as_bytes().cmp(other.as_bytes()))
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.as_bytes() == other.as_bytes()
    }
}

/// Keys of different lengths are unordered (`None`).
impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other).ok()
    }
}

impl fmt::Debug for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValue")
            .field("length", &self.length)
            .field("value", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

/// Strict-weak-ordering functor for index code.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCompare;

impl KeyCompare {
    /// `true` if `x` sorts before `y`.
    pub fn less(&self, x: &KeyValue, y: &KeyValue) -> Result<bool> {
        Ok(x.compare(y)? == Ordering::Less)
    }

    pub fn compare(&self, x: &KeyValue, y: &KeyValue) -> Result<Ordering> {
        x.compare(y)
    }
}
