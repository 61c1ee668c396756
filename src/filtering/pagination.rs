use serde::{Deserialize, Serialize};

/// Pagination in either page/limit or skip/take form.
///
/// `{"page": 2, "limit": 10}` is 1-indexed and becomes `skip = 10, take = 10`.
/// `{"skip": 5}` passes each present field through on its own, signed, so a
/// negative `take` reaches the store unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pagination {
    Page {
        page: u64,
        limit: u64,
    },
    Offset {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skip: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        take: Option<i64>,
    },
}

impl Pagination {
    #[must_use]
    pub fn page(page: u64, limit: u64) -> Self {
        Self::Page { page, limit }
    }

    #[must_use]
    pub fn offset(skip: Option<i64>, take: Option<i64>) -> Self {
        Self::Offset { skip, take }
    }

    /// Resolve to `(skip, take)`
    ///
    /// Page `0` is treated like page `1`. Page arithmetic saturates at
    /// `i64::MAX`.
    #[must_use]
    pub fn to_skip_take(self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Page { page, limit } => {
                let skip = page.saturating_sub(1).saturating_mul(limit);
                (Some(saturate(skip)), Some(saturate(limit)))
            }
            Self::Offset { skip, take } => (skip, take),
        }
    }
}

fn saturate(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
