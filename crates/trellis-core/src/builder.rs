//! Builders and field slots
//!
//! A [`Builder`] is a mutable, per-node construction object. Setters never
//! fail; every required-field check happens once, inside [`Builder::build`].
//!
//! [`Required`] and [`Optional`] are the field slots builders are made of:
//!
//! ```rust
//! use trellis_core::{Builder, Optional, Required, Result};
//!
//! #[derive(Debug, PartialEq)]
//! struct Job {
//!     name: String,
//!     retries: u32,
//! }
//!
//! struct JobBuilder {
//!     name: Required<String>,
//!     retries: Optional<u32>,
//! }
//!
//! impl Default for JobBuilder {
//!     fn default() -> Self {
//!         Self {
//!             name: Required::new("name"),
//!             retries: Optional::new(0),
//!         }
//!     }
//! }
//!
//! impl Builder for JobBuilder {
//!     type Output = Job;
//!
//!     fn build(self) -> Result<Job> {
//!         Ok(Job {
//!             name: self.name.take("JobBuilder")?,
//!             retries: self.retries.get(),
//!         })
//!     }
//! }
//!
//! let mut builder = JobBuilder::default();
//! builder.name.set("lint".to_string());
//! assert_eq!(builder.build().unwrap(), Job { name: "lint".into(), retries: 0 });
//! ```

use crate::error::{Error, Result};

/// Mutable construction object for one value
pub trait Builder: Sized {
    /// Value produced by [`Builder::build`]
    type Output;

    /// Validate fields and produce the value
    ///
    /// # Errors
    /// Returns [`Error::MissingField`] if a required field was never set.
    fn build(self) -> Result<Self::Output>;
}

/// Required field slot
#[derive(Debug, Clone, PartialEq)]
pub struct Required<T> {
    field: &'static str,
    value: Option<T>,
}

impl<T> Required<T> {
    /// Create unset slot for `field`
    #[inline]
    #[must_use]
    pub const fn new(field: &'static str) -> Self {
        Self { field, value: None }
    }

    /// Set value, replacing any earlier one
    #[inline]
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Check if set
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow current value
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Field name
    #[inline]
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Take value for finalization
    ///
    /// # Errors
    /// Returns [`Error::MissingField`] naming `builder` and this field if unset.
    #[inline]
    pub fn take(self, builder: &'static str) -> Result<T> {
        self.value
            .ok_or_else(|| Error::missing_field(builder, self.field))
    }
}

/// Optional field slot with a declared default
#[derive(Debug, Clone, PartialEq)]
pub struct Optional<T> {
    default: T,
    value: Option<T>,
}

impl<T> Optional<T> {
    /// Create slot with default
    #[inline]
    #[must_use]
    pub const fn new(default: T) -> Self {
        Self {
            default,
            value: None,
        }
    }

    /// Set value
    #[inline]
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Check if explicitly set
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Value or default
    #[inline]
    #[must_use]
    pub fn get(self) -> T {
        self.value.unwrap_or(self.default)
    }
}

impl<T: Default> Default for Optional<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
