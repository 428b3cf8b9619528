use std::error::Error;
use std::future::Future;

use async_trait::async_trait;

use crate::EntryRef;

/// Fetches fresh content for a cache entry that missed.
///
/// The cache calls [`resolve`](Resolver::resolve) on at most one task per key at
/// a time. An implementation obtains the content and stores it with
/// [`Cache::set`](crate::Cache::set) before returning `Ok`.
#[async_trait]
pub trait Resolver {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn resolve(&self, entry: EntryRef) -> Result<(), Self::Error>;
}

#[derive(Debug)]
pub struct ResolverFn<F> {
    f: F,
}

#[async_trait]
impl<Err, F, Fut> Resolver for ResolverFn<F>
where
    F: Fn(EntryRef) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<(), Err>> + Send,
{
    type Error = Err;

    async fn resolve(&self, entry: EntryRef) -> Result<(), Self::Error> {
        (self.f)(entry).await
    }
}

pub fn make_resolver<F, Err, Ret>(f: F) -> ResolverFn<F>
where
    Err: Into<Box<dyn Error + Send + Sync>>,
    Ret: Future<Output = Result<(), Err>>,
    F: Fn(EntryRef) -> Ret,
{
    ResolverFn { f }
}
