//! Page/limit validation shared by the paginated Recoup endpoints.

use crate::error::DataError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Optional paging parameters as supplied by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub const fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self { page, limit }
    }

    /// Apply defaults and bounds, returning `(page, limit)`.
    pub fn resolve(self) -> Result<(u32, u32), DataError> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        if page < 1 {
            return Err(DataError::Validation("page must be >= 1".into()));
        }
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(DataError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok((page, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied() {
        assert_eq!(PageQuery::default().resolve().unwrap(), (1, 20));
    }

    #[test]
    fn explicit_values_kept() {
        assert_eq!(PageQuery::new(Some(3), Some(100)).resolve().unwrap(), (3, 100));
    }

    #[test]
    fn zero_page_rejected() {
        assert!(matches!(
            PageQuery::new(Some(0), None).resolve(),
            Err(DataError::Validation(_))
        ));
    }

    #[test]
    fn limit_out_of_range_rejected() {
        assert!(PageQuery::new(None, Some(0)).resolve().is_err());
        assert!(PageQuery::new(None, Some(101)).resolve().is_err());
    }
}
