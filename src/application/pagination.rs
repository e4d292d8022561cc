//! Exhaustive harvesting of paged list endpoints.

use std::future::Future;
use std::num::NonZeroUsize;

use tracing::debug;

use crate::infrastructure::traits::Page;

/// Fetch pages from offset 0 until a page comes back shorter than `page_size`.
///
/// Items keep page order. When the total is an exact multiple of `page_size`
/// one trailing empty page is requested. The first failing page aborts the
/// harvest; nothing fetched so far is returned.
pub async fn harvest_all<T, E, F, Fut>(page_size: NonZeroUsize, mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let limit = page_size.get();
    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch_page(Page { offset, limit }).await?;
        let fetched = page.len();
        items.extend(page);
        debug!(offset, fetched, total = items.len(), "harvested page");

        if fetched < limit {
            break;
        }
        offset += limit;
    }

    Ok(items)
}
