use serde::Deserialize;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// `?skip=&limit=` paging for list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn skip(&self) -> u64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}
