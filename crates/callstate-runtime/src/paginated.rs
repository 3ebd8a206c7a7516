//! Paginated executor: page-by-page fetches accumulated into one list.

use crate::call::RemoteCall;
use crate::executor::CallExecutor;
use callstate_core::{
    CallFailure, CallOptions, CallResult, CallState, EngineResult, Notifier, Page, PageRequest,
    PaginationOptions, PaginationState,
};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default)]
struct FetchControl {
    /// Ticket of the most recently started fetch; only it may apply a page.
    issued: u64,
    /// Ticket of the fetch currently holding the load-more guard.
    active: Option<u64>,
}

/// Drives a page fetcher through a [`CallExecutor`], accumulating items.
pub struct PaginatedExecutor<P, T> {
    executor: CallExecutor<PageRequest<P>, Page<T>>,
    control: Mutex<FetchControl>,
    pagination: watch::Sender<PaginationState<T>>,
}

impl<P, T> PaginatedExecutor<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// A `page_size` of 0 is raised to 1; use [`try_new`](Self::try_new) to
    /// reject it instead.
    pub fn new(
        fetcher: impl RemoteCall<PageRequest<P>, Page<T>> + 'static,
        page_size: u32,
        options: CallOptions,
    ) -> Self {
        let (pagination, _) = watch::channel(PaginationState::new(page_size.max(1)));
        Self {
            executor: CallExecutor::new(fetcher, options),
            control: Mutex::new(FetchControl::default()),
            pagination,
        }
    }

    /// Validating constructor: rejects a zero page size or a zero timeout
    pub fn try_new(
        fetcher: impl RemoteCall<PageRequest<P>, Page<T>> + 'static,
        page_size: u32,
        options: CallOptions,
    ) -> EngineResult<Self> {
        PaginationOptions { page_size }.validate()?;
        Ok(Self {
            executor: CallExecutor::try_new(fetcher, options)?,
            control: Mutex::new(FetchControl::default()),
            pagination: watch::channel(PaginationState::new(page_size)).0,
        })
    }

    pub fn from_fn<F, Fut>(f: F, page_size: u32, options: CallOptions) -> Self
    where
        F: Fn(Option<PageRequest<P>>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult<Page<T>>> + Send + 'static,
    {
        Self::new(f, page_size, options)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.executor = self.executor.with_notifier(notifier);
        self
    }

    pub fn on_success(mut self, hook: impl Fn(&Page<T>) + Send + Sync + 'static) -> Self {
        self.executor = self.executor.on_success(hook);
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&CallFailure) + Send + Sync + 'static) -> Self {
        self.executor = self.executor.on_error(hook);
        self
    }

    /// State of the underlying call (last page, status, error)
    pub fn state(&self) -> CallState<Page<T>> {
        self.executor.state()
    }

    pub fn pagination(&self) -> PaginationState<T> {
        self.pagination.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PaginationState<T>> {
        self.pagination.subscribe()
    }

    pub fn items(&self) -> Vec<T> {
        self.pagination.borrow().items.clone()
    }

    pub fn has_more(&self) -> bool {
        self.pagination.borrow().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.executor.is_loading()
    }

    /// Fetch `page`; page 1 replaces accumulated items, later pages append.
    pub async fn load_page(&self, page: u32, extra: Option<P>) -> Option<Page<T>> {
        let ticket = self.claim();
        self.fetch(page, extra, ticket).await
    }

    /// Fetch the next page unless there is none or a fetch is in flight.
    pub async fn load_more(&self, extra: Option<P>) -> Option<Page<T>> {
        let (ticket, next) = {
            let mut control = self.control();
            let pagination = self.pagination.borrow();
            if !pagination.has_more || control.active.is_some() || self.executor.is_loading() {
                debug!(has_more = pagination.has_more, "load_more skipped");
                return None;
            }
            let Some(next) = pagination.page.checked_add(1) else {
                debug!(page = pagination.page, "no page number after the last one");
                return None;
            };
            drop(pagination);
            control.issued += 1;
            control.active = Some(control.issued);
            (control.issued, next)
        };
        self.fetch(next, extra, ticket).await
    }

    /// Start over from page 1 with an empty list
    pub async fn refresh(&self, extra: Option<P>) -> Option<Page<T>> {
        let ticket = self.claim();
        self.pagination.send_modify(PaginationState::clear);
        self.fetch(1, extra, ticket).await
    }

    /// Cancel any fetch and clear all pagination bookkeeping
    pub fn reset(&self) {
        self.executor.reset();
        let mut control = self.control();
        control.issued += 1;
        control.active = None;
        self.pagination.send_modify(PaginationState::clear);
    }

    fn control(&self) -> MutexGuard<'_, FetchControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self) -> u64 {
        let mut control = self.control();
        control.issued += 1;
        control.active = Some(control.issued);
        control.issued
    }

    async fn fetch(&self, page: u32, extra: Option<P>, ticket: u64) -> Option<Page<T>> {
        let page = page.max(1);
        let request = PageRequest {
            page,
            page_size: self.pagination.borrow().page_size,
            extra,
        };
        debug!(page, ticket, "fetching page");
        let outcome = self.executor.execute(Some(request)).await;

        let mut control = self.control();
        if control.active == Some(ticket) {
            control.active = None;
        }
        let fetched = outcome?;
        if control.issued != ticket {
            debug!(page, ticket, "discarding superseded page");
            return None;
        }
        self.pagination
            .send_modify(|state| state.apply(page, fetched.clone()));
        Some(fetched)
    }
}

impl<P, T> std::fmt::Debug for PaginatedExecutor<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedExecutor")
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}
