//! 페이지/기간 분할 조회.
//!
//! - [`fetch_all_pages`] - offset/limit 방식. 페이지 크기보다 적게 오거나 빈 페이지가 오면 종료
//! - [`fetch_by_date_windows`] - 긴 기간을 최대 일수 단위로 나눠 순서대로 조회
//!
//! 어느 한 요청이라도 실패하면 전체가 실패하며 부분 결과는 돌려주지 않습니다.

use chrono::{Duration, NaiveDate};
use std::future::Future;
use tracing::debug;

/// 모든 페이지를 가져와 하나의 목록으로 합칩니다.
///
/// `fetch(offset, limit)`는 한 페이지를 돌려줍니다.
pub async fn fetch_all_pages<T, E, F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let page_size = page_size.max(1);
    let mut rows = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch(offset, page_size).await?;
        let received = page.len();
        rows.extend(page);

        debug!(offset, received, total = rows.len(), "Fetched page");

        if received < page_size {
            break;
        }
        offset += page_size;
    }

    Ok(rows)
}

/// `[start, end]`를 최대 `max_days`일씩 연속된 구간으로 나눕니다 (양 끝 포함).
///
/// `start > end`이면 빈 목록입니다.
pub fn split_date_range(start: NaiveDate, end: NaiveDate, max_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let span = Duration::days(i64::from(max_days.max(1)) - 1);
    let mut windows = Vec::new();
    let mut cursor = start;

    while cursor <= end {
        let window_end = (cursor + span).min(end);
        windows.push((cursor, window_end));
        cursor = window_end + Duration::days(1);
    }

    windows
}

/// 기간을 나눠 구간별로 조회하고 결과를 이어 붙입니다.
pub async fn fetch_by_date_windows<T, E, F, Fut>(
    start: NaiveDate,
    end: NaiveDate,
    max_days: u32,
    mut fetch: F,
) -> Result<Vec<T>, E>
where
    F: FnMut(NaiveDate, NaiveDate) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let mut rows = Vec::new();
    for (window_start, window_end) in split_date_range(start, end, max_days) {
        let chunk = fetch(window_start, window_end).await?;
        debug!(%window_start, %window_end, received = chunk.len(), "Fetched date window");
        rows.extend(chunk);
    }
    Ok(rows)
}
