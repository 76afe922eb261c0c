//! Translators
//!
//! A [`Translator`] is a pure mapping from one value to another. Translators
//! compose left to right with [`TranslatorExt::then`]; the first failing
//! stage's error is the pipeline's error and later stages never run.

use crate::error::Result;
use std::marker::PhantomData;

/// Pure mapping from `I` to `O`
pub trait Translator<I, O> {
    /// Translate input
    ///
    /// # Errors
    /// Stage-specific; pipelines pass it through unchanged.
    fn translate(&self, input: I) -> Result<O>;
}

impl<I, O, F> Translator<I, O> for F
where
    F: Fn(I) -> Result<O>,
{
    #[inline]
    fn translate(&self, input: I) -> Result<O> {
        self(input)
    }
}

/// Pin a closure's signature so it can be used as a translator
#[inline]
pub fn from_fn<I, O, F>(f: F) -> F
where
    F: Fn(I) -> Result<O>,
{
    f
}

/// Translator returning its input
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> Translator<T, T> for Identity {
    #[inline]
    fn translate(&self, input: T) -> Result<T> {
        Ok(input)
    }
}

/// Identity translator
#[inline]
#[must_use]
pub fn identity() -> Identity {
    Identity
}

/// Two translators run in sequence through intermediate type `M`
#[derive(Debug, Clone)]
pub struct Pipeline<A, B, M> {
    first: A,
    second: B,
    _intermediate: PhantomData<fn() -> M>,
}

impl<A, B, M> Pipeline<A, B, M> {
    /// Compose `first` then `second`
    #[inline]
    #[must_use]
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _intermediate: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Translator<I, O> for Pipeline<A, B, M>
where
    A: Translator<I, M>,
    B: Translator<M, O>,
{
    fn translate(&self, input: I) -> Result<O> {
        let intermediate = self.first.translate(input)?;
        self.second.translate(intermediate)
    }
}

/// Composition helpers for translators
pub trait TranslatorExt<I, O>: Translator<I, O> + Sized {
    /// Run `next` on this translator's output
    fn then<P, T>(self, next: T) -> Pipeline<Self, T, O>
    where
        T: Translator<O, P>,
    {
        Pipeline::new(self, next)
    }
}

impl<I, O, T> TranslatorExt<I, O> for T where T: Translator<I, O> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;

    #[test]
    fn closures_are_translators() {
        let double = from_fn(|x: i32| Ok(x * 2));
        assert_eq!(double.translate(21).unwrap(), 42);
    }

    #[test]
    fn pipeline_runs_left_to_right() {
        let pipeline = from_fn(|x: i32| Ok(x + 1))
            .then(from_fn(|x: i32| Ok(x * 10)))
            .then(from_fn(|x: i32| Ok(format!("#{x}"))));
        assert_eq!(pipeline.translate(1).unwrap(), "#20");
    }

    #[test]
    fn first_failure_aborts_pipeline() {
        let reached = Cell::new(false);
        let pipeline = from_fn(|x: i32| Ok(x))
            .then(from_fn(|_: i32| -> Result<i32> { Err(Error::translation("stage two")) }))
            .then(from_fn(|x: i32| {
                reached.set(true);
                Ok(x)
            }));

        assert_eq!(
            pipeline.translate(5).unwrap_err(),
            Error::translation("stage two")
        );
        assert!(!reached.get());
    }

    #[test]
    fn identity_passes_through() {
        let pipeline = identity().then(from_fn(|n: usize| Ok(n + 1)));
        assert_eq!(pipeline.translate(2usize).unwrap(), 3);
    }
}
