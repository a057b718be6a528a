//! Suspend-once producers backing the generator factory shapes.
//!
//! A generator factory splits a resource's life into two halves: the first
//! [`resume`](Generator::resume) acquires the resource and yields it, the
//! second runs the teardown and reports [`Step::Complete`]. Anything else on
//! the second resume is a contract violation the singleton reports as
//! [`SingletonError::MalformedFinalizer`](crate::SingletonError::MalformedFinalizer).
//!
//! Most callers never implement the traits by hand. [`once`] and
//! [`acquire_release`] model the acquire/release pair as two closures and
//! cannot yield twice.

use async_trait::async_trait;
use std::future::Future;

use crate::error::FactoryResult;

/// Outcome of resuming a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// The generator suspended with a value
    Yielded(T),
    /// The generator ran to completion
    Complete,
}

impl<T> Step<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Step::Complete)
    }
}

/// Synchronous resumable producer.
///
/// # Examples
///
/// ```
/// use singletondep::generator::{self, Generator, Step};
///
/// let mut gen = generator::once("conn", || Ok(()));
/// assert_eq!(gen.resume().unwrap(), Step::Yielded("conn"));
/// assert_eq!(gen.resume().unwrap(), Step::Complete);
/// ```
pub trait Generator<T>: Send {
    /// Runs the generator up to its next suspension point or to completion.
    fn resume(&mut self) -> FactoryResult<Step<T>>;
}

/// Asynchronous resumable producer.
///
/// Both the first production and the teardown may await.
#[async_trait]
pub trait AsyncGenerator<T>: Send {
    /// Runs the generator up to its next suspension point or to completion.
    async fn resume(&mut self) -> FactoryResult<Step<T>>;
}

/// Generator that yields `value` once, then runs `teardown` and completes.
pub struct Once<T, F> {
    value: Option<T>,
    teardown: Option<F>,
}

/// Builds a [`Once`] generator from a value and its teardown closure.
pub fn once<T, F>(value: T, teardown: F) -> Once<T, F>
where
    T: Send,
    F: FnOnce() -> FactoryResult<()> + Send,
{
    Once {
        value: Some(value),
        teardown: Some(teardown),
    }
}

impl<T, F> Generator<T> for Once<T, F>
where
    T: Send,
    F: FnOnce() -> FactoryResult<()> + Send,
{
    fn resume(&mut self) -> FactoryResult<Step<T>> {
        if let Some(value) = self.value.take() {
            return Ok(Step::Yielded(value));
        }
        if let Some(teardown) = self.teardown.take() {
            teardown()?;
        }
        Ok(Step::Complete)
    }
}

/// Generator driven by a closure; each call to the closure is one resume.
pub struct FromFn<F>(F);

/// Wraps a closure as a [`Generator`].
///
/// The closure is fully responsible for the protocol, so it can express
/// generators that yield more than once.
pub fn from_fn<T, F>(f: F) -> FromFn<F>
where
    F: FnMut() -> FactoryResult<Step<T>> + Send,
{
    FromFn(f)
}

impl<T, F> Generator<T> for FromFn<F>
where
    F: FnMut() -> FactoryResult<Step<T>> + Send,
{
    fn resume(&mut self) -> FactoryResult<Step<T>> {
        (self.0)()
    }
}

enum Stage<Fut, R> {
    Acquire(Fut),
    Release(R),
    Done,
}

/// Async generator built from an acquire future and the release closure it returns.
pub struct AcquireRelease<Fut, R> {
    stage: Stage<Fut, R>,
}

/// Builds an [`AsyncGenerator`] from an acquire future.
///
/// The future resolves to the value and a release closure. The first resume
/// awaits the future and yields the value; the second awaits the release.
///
/// # Examples
///
/// ```
/// use singletondep::generator::{self, AsyncGenerator, Step};
/// use singletondep::BoxError;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut gen = generator::acquire_release(async {
///     let pool = "pool".to_string();
///     Ok::<_, BoxError>((pool, || async { Ok::<(), BoxError>(()) }))
/// });
/// assert_eq!(gen.resume().await.unwrap(), Step::Yielded("pool".to_string()));
/// assert_eq!(gen.resume().await.unwrap(), Step::Complete);
/// # }
/// ```
pub fn acquire_release<T, Fut, R, RFut>(acquire: Fut) -> AcquireRelease<Fut, R>
where
    T: Send,
    Fut: Future<Output = FactoryResult<(T, R)>> + Send,
    R: FnOnce() -> RFut + Send,
    RFut: Future<Output = FactoryResult<()>> + Send,
{
    AcquireRelease {
        stage: Stage::Acquire(acquire),
    }
}

#[async_trait]
impl<T, Fut, R, RFut> AsyncGenerator<T> for AcquireRelease<Fut, R>
where
    T: Send,
    Fut: Future<Output = FactoryResult<(T, R)>> + Send,
    R: FnOnce() -> RFut + Send,
    RFut: Future<Output = FactoryResult<()>> + Send,
{
    async fn resume(&mut self) -> FactoryResult<Step<T>> {
        match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Acquire(acquire) => {
                let (value, release) = acquire.await?;
                self.stage = Stage::Release(release);
                Ok(Step::Yielded(value))
            }
            Stage::Release(release) => {
                release().await?;
                Ok(Step::Complete)
            }
            Stage::Done => Ok(Step::Complete),
        }
    }
}
