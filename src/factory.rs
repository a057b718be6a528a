//! Factory shapes accepted by [`LifecycleSingleton`](crate::LifecycleSingleton).

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::FactoryResult;
use crate::generator::{AsyncGenerator, Generator};

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type ValueFn<T, A> = Box<dyn Fn(A) -> FactoryResult<T> + Send + Sync>;
type FutureFn<T, A> = Box<dyn Fn(A) -> BoxFuture<'static, FactoryResult<T>> + Send + Sync>;
type GeneratorFn<T, A> = Box<dyn Fn(A) -> Box<dyn Generator<T>> + Send + Sync>;
type AsyncGeneratorFn<T, A> = Box<dyn Fn(A) -> Box<dyn AsyncGenerator<T>> + Send + Sync>;

/// Tag naming which of the four factory shapes a singleton wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryShape {
    /// Returns its value synchronously
    Value,
    /// Returns its value from a future
    Future,
    /// Yields its value once and tears down on the next resume
    Generator,
    /// Like `Generator`, with both halves asynchronous
    AsyncGenerator,
}

impl FactoryShape {
    /// Returns true if the shape records a finalizer on `init()`.
    pub fn has_finalizer(self) -> bool {
        matches!(self, FactoryShape::Generator | FactoryShape::AsyncGenerator)
    }
}

impl fmt::Display for FactoryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FactoryShape::Value => "value",
            FactoryShape::Future => "future",
            FactoryShape::Generator => "generator",
            FactoryShape::AsyncGenerator => "async generator",
        };
        f.write_str(name)
    }
}

/// A factory tagged with its shape.
///
/// The tag is fixed when the factory is built, one constructor per shape.
/// `A` is the argument forwarded verbatim from `init()`; use a tuple when the
/// factory needs several.
///
/// # Examples
///
/// ```rust
/// use singletondep::{Factory, FactoryShape, generator};
///
/// let plain = Factory::value(|url: String| Ok(url.len()));
/// assert_eq!(plain.shape(), FactoryShape::Value);
///
/// let scoped = Factory::generator(|url: String| generator::once(url, || Ok(())));
/// assert_eq!(scoped.shape(), FactoryShape::Generator);
/// ```
pub enum Factory<T, A = ()> {
    Value(ValueFn<T, A>),
    Future(FutureFn<T, A>),
    Generator(GeneratorFn<T, A>),
    AsyncGenerator(AsyncGeneratorFn<T, A>),
}

impl<T, A> Factory<T, A>
where
    T: Send + 'static,
    A: 'static,
{
    /// Factory that computes its value synchronously.
    pub fn value<F>(f: F) -> Self
    where
        F: Fn(A) -> FactoryResult<T> + Send + Sync + 'static,
    {
        Factory::Value(Box::new(f))
    }

    /// Factory that computes its value asynchronously.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FactoryResult<T>> + Send + 'static,
    {
        Factory::Future(Box::new(move |args| -> BoxFuture<'static, FactoryResult<T>> {
            Box::pin(f(args))
        }))
    }

    /// Factory that yields its value from a [`Generator`].
    pub fn generator<F, G>(f: F) -> Self
    where
        F: Fn(A) -> G + Send + Sync + 'static,
        G: Generator<T> + 'static,
    {
        Factory::Generator(Box::new(move |args| -> Box<dyn Generator<T>> {
            Box::new(f(args))
        }))
    }

    /// Factory that yields its value from an [`AsyncGenerator`].
    pub fn async_generator<F, G>(f: F) -> Self
    where
        F: Fn(A) -> G + Send + Sync + 'static,
        G: AsyncGenerator<T> + 'static,
    {
        Factory::AsyncGenerator(Box::new(move |args| -> Box<dyn AsyncGenerator<T>> {
            Box::new(f(args))
        }))
    }
}

impl<T, A> Factory<T, A> {
    /// The shape this factory was built with.
    pub fn shape(&self) -> FactoryShape {
        match self {
            Factory::Value(_) => FactoryShape::Value,
            Factory::Future(_) => FactoryShape::Future,
            Factory::Generator(_) => FactoryShape::Generator,
            Factory::AsyncGenerator(_) => FactoryShape::AsyncGenerator,
        }
    }
}

impl<T, A> fmt::Debug for Factory<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Factory").field(&self.shape()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{self, Step};

    #[test]
    fn test_shape_is_fixed_by_constructor() {
        let value: Factory<u32> = Factory::value(|()| Ok(1));
        let future: Factory<u32> = Factory::future(|()| async { Ok(2) });
        let gen: Factory<u32> = Factory::generator(|()| generator::once(3, || Ok(())));
        let async_gen: Factory<u32> = Factory::async_generator(|()| {
            generator::acquire_release(async {
                Ok::<_, crate::BoxError>((4, || async { Ok::<(), crate::BoxError>(()) }))
            })
        });

        assert_eq!(value.shape(), FactoryShape::Value);
        assert_eq!(future.shape(), FactoryShape::Future);
        assert_eq!(gen.shape(), FactoryShape::Generator);
        assert_eq!(async_gen.shape(), FactoryShape::AsyncGenerator);
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!FactoryShape::Value.has_finalizer());
        assert!(!FactoryShape::Future.has_finalizer());
        assert!(FactoryShape::Generator.has_finalizer());
        assert!(FactoryShape::AsyncGenerator.has_finalizer());
    }

    #[test]
    fn test_generator_factory_builds_fresh_generator_per_call() {
        let factory: Factory<String, &'static str> =
            Factory::generator(|name: &'static str| generator::once(name.to_uppercase(), || Ok(())));
        let Factory::Generator(build) = &factory else {
            panic!("expected generator shape");
        };
        let mut first = build("a");
        let mut second = build("b");
        assert_eq!(first.resume().unwrap(), Step::Yielded("A".to_string()));
        assert_eq!(second.resume().unwrap(), Step::Yielded("B".to_string()));
    }

    #[test]
    fn test_debug_shows_shape() {
        let factory: Factory<u8> = Factory::value(|()| Ok(0));
        assert_eq!(format!("{:?}", factory), "Factory(Value)");
        assert_eq!(FactoryShape::AsyncGenerator.to_string(), "async generator");
    }
}
