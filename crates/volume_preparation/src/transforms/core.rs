use super::rng::SampleRng;
use anyhow::{Context, Result};
use std::marker::PhantomData;

/// Defines the core `Transform` trait for composable volume pipelines.
///
/// The `Transform<I, O>` trait represents an operation converting an input
/// of type `I` to an output of type `O`. Randomized transforms draw every
/// random parameter from the [`SampleRng`] they are handed, never from a
/// global or thread-local generator, so the same seed always reproduces the
/// same output.
///
/// Steps with different input/output types are chained via `.then(...)`.
/// Volume-to-volume steps that must stay aligned with a paired pipeline are
/// collected in a [`Compose`](super::Compose) instead.
///
/// Note: `then()` works only when:
/// 1. **Types align**: `self: Transform<I, O>`, `next: Transform<O, M>`
/// 2. **Owned**: `Self::Sized` (no trait objects, must be concrete)
/// 3. **Thread-safe**: intermediate and output types must be `Send`
pub trait Transform<I, O>: Send + Sync {
    /// Applies the transformation to the input
    fn apply(&self, input: I, rng: &mut SampleRng) -> Result<O>;

    /// Every parameter that decides where voxels end up, or `None` for steps
    /// that leave geometry alone.
    ///
    /// Interpolation is excluded: an image and its label may be resampled
    /// differently as long as they are moved identically. Two spatial steps
    /// pair up only when their geometry strings are equal.
    fn geometry(&self) -> Option<String> {
        None
    }

    /// Whether the transform moves voxels (rotation, flip, crop, resampling).
    fn is_spatial(&self) -> bool {
        self.geometry().is_some()
    }

    /// Short name used in error messages and pipeline validation.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

impl<I, O> Transform<I, O> for Box<dyn Transform<I, O>> {
    fn apply(&self, input: I, rng: &mut SampleRng) -> Result<O> {
        (**self).apply(input, rng)
    }

    fn geometry(&self) -> Option<String> {
        (**self).geometry()
    }

    fn is_spatial(&self) -> bool {
        (**self).is_spatial()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// A chain of two transforms (`A` -> `B`)
/// - `PhantomData<M>` enforces intermediate type alignment.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    /// Creates a new transform chain.
    /// Use [`Transform::then`] for better ergonomics.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I, rng: &mut SampleRng) -> Result<O> {
        self.first
            .apply(input, rng)
            .and_then(|mid| self.second.apply(mid, rng))
            .with_context(|| {
                format!(
                    "Transform chain failed: {} → {}",
                    self.first.name(),
                    self.second.name()
                )
            })
    }

    fn geometry(&self) -> Option<String> {
        match (self.first.geometry(), self.second.geometry()) {
            (None, None) => None,
            (first, second) => Some(format!(
                "{} -> {}",
                first.as_deref().unwrap_or("-"),
                second.as_deref().unwrap_or("-")
            )),
        }
    }
}
