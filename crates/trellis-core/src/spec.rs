//! Specifications
//!
//! A [`Spec`] is a reusable, declarative description of a value. Applying it
//! to a context instantiates a fresh builder and runs the spec's body
//! against it; nothing happens until then, and separate applications never
//! affect each other.
//!
//! ```rust
//! use trellis_core::{spec_fn, translate, Builder, Required, Result, Scaffold, ScaffoldKind};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! struct Plain;
//!
//! impl ScaffoldKind for Plain {
//!     fn as_str(&self) -> &'static str {
//!         "plain"
//!     }
//! }
//!
//! struct GreetingBuilder {
//!     name: Required<String>,
//! }
//!
//! impl Default for GreetingBuilder {
//!     fn default() -> Self {
//!         Self { name: Required::new("name") }
//!     }
//! }
//!
//! impl Builder for GreetingBuilder {
//!     type Output = Scaffold<Plain, String>;
//!
//!     fn build(self) -> Result<Self::Output> {
//!         let name = self.name.take("GreetingBuilder")?;
//!         Ok(Scaffold::value(format!("hello, {name}")))
//!     }
//! }
//!
//! let greeting = spec_fn(|user: &String, b: &mut GreetingBuilder| {
//!     b.name.set(user.clone());
//!     Ok(())
//! });
//!
//! assert_eq!(translate(&"ada".to_string(), &greeting).unwrap(), "hello, ada");
//! ```

use crate::builder::Builder;
use crate::error::Result;
use crate::key::ScaffoldKind;
use crate::scaffold::{Producer, Scaffold};
use crate::translator::Translator;
use std::marker::PhantomData;
use std::sync::Arc;

/// Declarative description of a value, parameterized by a context `C`
pub trait Spec<C: ?Sized> {
    /// Builder the body populates
    type Builder: Builder;

    /// Instantiate a fresh builder for one application
    fn builder(&self, context: &C) -> Self::Builder;

    /// Populate `builder`
    ///
    /// # Errors
    /// Body-specific; aborts the application.
    fn body(&self, context: &C, builder: &mut Self::Builder) -> Result<()>;
}

impl<C: ?Sized, S: Spec<C> + ?Sized> Spec<C> for Arc<S> {
    type Builder = S::Builder;

    fn builder(&self, context: &C) -> Self::Builder {
        (**self).builder(context)
    }

    fn body(&self, context: &C, builder: &mut Self::Builder) -> Result<()> {
        (**self).body(context, builder)
    }
}

/// Apply `spec` to `context`, returning the populated builder
///
/// # Errors
/// Returns the body's error.
pub fn apply<C, S>(context: &C, spec: &S) -> Result<S::Builder>
where
    C: ?Sized,
    S: Spec<C> + ?Sized,
{
    let mut builder = spec.builder(context);
    spec.body(context, &mut builder)?;
    Ok(builder)
}

/// Apply `spec` and finalize its builder
///
/// # Errors
/// Returns the body's error or the builder's validation error.
pub fn build<C, S>(context: &C, spec: &S) -> Result<<S::Builder as Builder>::Output>
where
    C: ?Sized,
    S: Spec<C> + ?Sized,
{
    apply(context, spec)?.build()
}

/// Apply, build and resolve a spec with no references, synchronously
///
/// # Errors
/// - Body and builder errors
/// - [`Error::UnresolvedReference`](crate::Error::UnresolvedReference) if
///   the scaffold contains a reference
pub fn translate<C, S, K, V>(context: &C, spec: &S) -> Result<V>
where
    C: ?Sized,
    S: Spec<C> + ?Sized,
    S::Builder: Builder<Output = Scaffold<K, V>>,
    K: ScaffoldKind,
    V: Send + 'static,
{
    build(context, spec)?.resolve_local()
}

/// Spec whose body is a closure over a default-constructed builder
pub struct FnSpec<B, F> {
    body: F,
    _builder: PhantomData<fn() -> B>,
}

/// Turn a closure into a reusable spec
pub fn spec_fn<C, B, F>(body: F) -> FnSpec<B, F>
where
    C: ?Sized,
    B: Builder + Default,
    F: Fn(&C, &mut B) -> Result<()>,
{
    FnSpec {
        body,
        _builder: PhantomData,
    }
}

impl<C, B, F> Spec<C> for FnSpec<B, F>
where
    C: ?Sized,
    B: Builder + Default,
    F: Fn(&C, &mut B) -> Result<()>,
{
    type Builder = B;

    fn builder(&self, _context: &C) -> B {
        B::default()
    }

    fn body(&self, context: &C, builder: &mut B) -> Result<()> {
        (self.body)(context, builder)
    }
}

/// Spec whose built output is passed through a translator
pub struct Mapped<S, T, O> {
    spec: S,
    translator: Arc<T>,
    _output: PhantomData<fn() -> O>,
}

/// Builder of a [`Mapped`] spec
pub struct MappedBuilder<B, T, O> {
    inner: B,
    translator: Arc<T>,
    _output: PhantomData<fn() -> O>,
}

impl<B, T, O> MappedBuilder<B, T, O> {
    /// Borrow the wrapped builder
    #[inline]
    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.inner
    }
}

impl<B, T, O> Builder for MappedBuilder<B, T, O>
where
    B: Builder,
    T: Translator<B::Output, O>,
{
    type Output = O;

    fn build(self) -> Result<O> {
        let built = self.inner.build()?;
        self.translator.translate(built)
    }
}

impl<C, S, T, O> Spec<C> for Mapped<S, T, O>
where
    C: ?Sized,
    S: Spec<C>,
    T: Translator<<S::Builder as Builder>::Output, O>,
{
    type Builder = MappedBuilder<S::Builder, T, O>;

    fn builder(&self, context: &C) -> Self::Builder {
        MappedBuilder {
            inner: self.spec.builder(context),
            translator: Arc::clone(&self.translator),
            _output: PhantomData,
        }
    }

    fn body(&self, context: &C, builder: &mut Self::Builder) -> Result<()> {
        self.spec.body(context, &mut builder.inner)
    }
}

/// Composition helpers for specs
pub trait SpecExt<C: ?Sized>: Spec<C> + Sized {
    /// Pass this spec's built output through `translator`
    fn map<T, O>(self, translator: T) -> Mapped<Self, T, O>
    where
        T: Translator<<Self::Builder as Builder>::Output, O>,
    {
        Mapped {
            spec: self,
            translator: Arc::new(translator),
            _output: PhantomData,
        }
    }
}

impl<C: ?Sized, S: Spec<C>> SpecExt<C> for S {}

impl<K, V> Producer<K, V>
where
    K: ScaffoldKind,
    V: Send + 'static,
{
    /// Producer that applies `spec` to `context` on demand
    ///
    /// This is how a named definition defers its own construction until the
    /// first reference to it is resolved.
    pub fn from_spec<C, S>(context: Arc<C>, spec: Arc<S>) -> Self
    where
        C: Send + Sync + ?Sized + 'static,
        S: Spec<C> + Send + Sync + ?Sized + 'static,
        S::Builder: Builder<Output = Scaffold<K, V>>,
    {
        Self::new(move || build(&*context, &*spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Required;
    use crate::error::Error;
    use crate::translator::from_fn;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct Unit;

    impl ScaffoldKind for Unit {
        fn as_str(&self) -> &'static str {
            "unit"
        }
    }

    struct Env {
        prefix: &'static str,
    }

    #[derive(Default)]
    struct LabelBuilder {
        text: Option<String>,
    }

    impl Builder for LabelBuilder {
        type Output = Scaffold<Unit, String>;

        fn build(self) -> Result<Self::Output> {
            let text = self.text.ok_or(Error::missing_field("LabelBuilder", "text"))?;
            Ok(Scaffold::value(text))
        }
    }

    struct CounterBuilder {
        count: Required<u32>,
    }

    impl Builder for CounterBuilder {
        type Output = u32;

        fn build(self) -> Result<u32> {
            self.count.take("CounterBuilder")
        }
    }

    struct CounterSpec;

    impl Spec<u32> for CounterSpec {
        type Builder = CounterBuilder;

        fn builder(&self, _context: &u32) -> CounterBuilder {
            CounterBuilder {
                count: Required::new("count"),
            }
        }

        fn body(&self, context: &u32, builder: &mut CounterBuilder) -> Result<()> {
            if *context > 0 {
                builder.count.set(*context);
            }
            Ok(())
        }
    }

    #[test]
    fn spec_is_reusable_across_contexts() {
        let label = spec_fn(|env: &Env, b: &mut LabelBuilder| {
            b.text = Some(format!("{}-label", env.prefix));
            Ok(())
        });

        assert_eq!(translate(&Env { prefix: "a" }, &label).unwrap(), "a-label");
        assert_eq!(translate(&Env { prefix: "b" }, &label).unwrap(), "b-label");
    }

    #[test]
    fn build_reports_missing_field() {
        assert_eq!(build(&3u32, &CounterSpec).unwrap(), 3);
        assert_eq!(
            build(&0u32, &CounterSpec).unwrap_err(),
            Error::missing_field("CounterBuilder", "count")
        );
    }

    #[test]
    fn apply_exposes_populated_builder() {
        let builder = apply(&7u32, &CounterSpec).unwrap();
        assert!(builder.count.is_set());
    }

    #[test]
    fn body_error_aborts() {
        let failing = spec_fn(|_: &Env, _: &mut LabelBuilder| Err(Error::translation("bad env")));
        assert_eq!(
            translate(&Env { prefix: "x" }, &failing).unwrap_err(),
            Error::translation("bad env")
        );
    }

    #[test]
    fn map_composes_spec_with_translator() {
        let doubled = CounterSpec.map(from_fn(|n: u32| Ok(n * 2)));
        assert_eq!(build(&4u32, &doubled).unwrap(), 8);

        let described = doubled.map(from_fn(|n: u32| Ok(format!("n={n}"))));
        assert_eq!(build(&4u32, &described).unwrap(), "n=8");
        assert!(build(&0u32, &described).is_err());
    }

    #[test]
    fn arc_spec_delegates() {
        let shared = Arc::new(CounterSpec);
        assert_eq!(build(&9u32, &shared).unwrap(), 9);
    }

    #[test]
    fn producer_from_spec_builds_lazily() {
        let label = spec_fn(|env: &Env, b: &mut LabelBuilder| {
            b.text = Some(env.prefix.to_string());
            Ok(())
        });
        let producer: Producer<Unit, String> =
            Producer::from_spec(Arc::new(Env { prefix: "p" }), Arc::new(label));
        let scaffold = futures::executor::block_on(producer.produce()).unwrap();
        assert_eq!(scaffold.resolve_local().unwrap(), "p");
    }
}
