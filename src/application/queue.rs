use crate::config::MAX_PAGE_SIZE;
use crate::domain::attempt::{PaymentAttempt, PaymentMethod};
use crate::domain::ports::AttemptStore;
use crate::error::{PaymentError, Result};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueFilter {
    pub method: Option<PaymentMethod>,
    pub search: Option<String>,
    /// 1-based; `None` means the first page.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }
}

/// Read-only view of attempts awaiting a human decision, oldest first.
pub struct VerificationQueue {
    attempts: Arc<dyn AttemptStore>,
    default_page_size: usize,
}

impl VerificationQueue {
    pub fn new(attempts: Arc<dyn AttemptStore>, default_page_size: usize) -> Self {
        Self {
            attempts,
            default_page_size,
        }
    }

    pub async fn list_pending(&self, filter: &QueueFilter) -> Result<Page<PaymentAttempt>> {
        let page = filter.page.unwrap_or(1);
        let page_size = filter.page_size.unwrap_or(self.default_page_size);
        if page == 0 {
            return Err(PaymentError::ValidationError(
                "Pages are numbered from 1".to_string(),
            ));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PaymentError::ValidationError(format!(
                "Page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let mut pending: Vec<PaymentAttempt> = self
            .attempts
            .all()
            .await?
            .into_iter()
            .filter(|a| a.status.is_pending())
            .filter(|a| filter.method.is_none_or(|m| a.method == m))
            .filter(|a| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|needle| a.matches_search(needle))
            })
            .collect();
        pending.sort_by_key(|a| (a.created_at, a.id));

        let total = pending.len();
        // a page past the end is empty, including one whose offset overflows
        let offset = (page - 1).checked_mul(page_size).unwrap_or(usize::MAX);
        let items = pending.into_iter().skip(offset).take(page_size).collect();
        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }
}
