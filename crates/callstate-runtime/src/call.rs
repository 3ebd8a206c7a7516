//! The unit of work wrapped by every executor

use async_trait::async_trait;
use callstate_core::CallResult;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// An asynchronous unit of work.
///
/// The token is cancelled when the attempt is superseded, cancelled, reset,
/// times out or its executor is dropped. Work that can stop early should
/// watch it; work that ignores it simply has its result discarded.
#[async_trait]
pub trait RemoteCall<P, T>: Send + Sync {
    async fn call(&self, params: Option<P>, cancel: CancellationToken) -> CallResult<T>;
}

#[async_trait]
impl<P, T, F, Fut> RemoteCall<P, T> for F
where
    P: Send + 'static,
    T: Send + 'static,
    F: Fn(Option<P>, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = CallResult<T>> + Send + 'static,
{
    async fn call(&self, params: Option<P>, cancel: CancellationToken) -> CallResult<T> {
        (self)(params, cancel).await
    }
}
