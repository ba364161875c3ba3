pub mod activity_log;
pub mod comment;
pub mod ids;
pub mod notification_outbox;
pub mod oauth_status;
pub mod priority;
pub mod status;
pub mod user;
pub mod work_item;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Offset-paginated result set shared by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
