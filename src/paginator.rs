use std::future::Future;

use async_stream::stream;
use futures::{Stream, TryStreamExt};

use crate::ports::ApiError;

/// Default number of items requested per page.
pub const PAGE_SIZE: u32 = 50;

/// One page of an offset based list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total reported by the service. Informational only, it can be stale.
    pub total: u32,
    /// Whether the service reported a next page. This is what ends pagination.
    pub has_next: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to fetch page at offset {offset}: {cause}")]
pub struct FetchError {
    pub offset: u32,
    #[source]
    pub cause: ApiError,
}

/// Turns an offset based list endpoint into a lazy stream of items.
///
/// Pagination strategy
/// - Requests are made in strictly increasing offsets, `page_size` apart.
/// - Stops right after the first page that reports no next page. `total` is never consulted.
/// - A failed page yields a single [`FetchError`] and ends the stream, no page is skipped.
pub fn paginate<'a, T, F, Fut>(
    page_size: u32,
    mut fetch: F,
) -> impl Stream<Item = Result<T, FetchError>> + 'a
where
    T: 'a,
    F: FnMut(u32, u32) -> Fut + 'a,
    Fut: Future<Output = Result<Page<T>, ApiError>> + 'a,
{
    stream! {
        let mut offset: u32 = 0;
        loop {
            log::debug!("Fetching page at offset {} (limit {})", offset, page_size);
            let page = match fetch(offset, page_size).await {
                Ok(page) => page,
                Err(cause) => {
                    log::warn!("Page fetch at offset {} failed: {}", offset, cause);
                    yield Err(FetchError { offset, cause });
                    return;
                }
            };

            let has_next = page.has_next;
            for item in page.items {
                yield Ok(item);
            }

            if !has_next {
                break;
            }
            offset += page_size;
        }
    }
}

/// Collects every item of a paginated endpoint, preserving order.
pub async fn fetch_all<T, F, Fut>(page_size: u32, fetch: F) -> Result<Vec<T>, FetchError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    paginate(page_size, fetch).try_collect().await
}
