//! `[from, to)` window → offset/size, with one extra hit to detect a next page

use serde::Serialize;

use crate::config::SearchConfig;

/// Page size used when the caller gives no `to`
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Largest `to` a window may reach
pub const MAX_TO: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    pub default_page_size: u32,
    pub max_to: u32,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_to: MAX_TO,
        }
    }
}

impl From<&SearchConfig> for PaginationPolicy {
    fn from(config: &SearchConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_to: config.max_to,
        }
    }
}

/// Normalized window
///
/// `0 <= from < to <= max_to` and `search_size == requested_size + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub from: u32,
    pub to: u32,
    pub requested_size: u32,
    pub search_size: u32,
}

impl PaginationPolicy {
    /// Normalize a requested window; never rejects input
    pub fn calculate(&self, from: Option<i64>, to: Option<i64>) -> PaginationInfo {
        let cap = i64::from(self.max_to.max(1));
        let page = i64::from(self.default_page_size.max(1));

        let from = from.unwrap_or(0).clamp(0, cap - 1);
        let to = match to {
            None => (from + page).min(cap),
            Some(to) => to.min(cap).max(from + 1),
        };

        // Both values are within [0, cap] and cap fits in u32
        let from = from as u32;
        let to = to as u32;
        let requested_size = to - from;

        PaginationInfo {
            from,
            to,
            requested_size,
            search_size: requested_size + 1,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_next: bool,
}

/// Trim the look-ahead hit and report whether more results exist
pub fn paginate<T>(mut docs: Vec<T>, requested_size: u32) -> Page<T> {
    let requested = requested_size as usize;
    let has_next = docs.len() > requested;
    docs.truncate(requested);
    Page {
        data: docs,
        has_next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(from: Option<i64>, to: Option<i64>) -> (u32, u32) {
        let info = PaginationPolicy::default().calculate(from, to);
        (info.from, info.to)
    }

    #[test]
    fn test_concrete_scenarios() {
        assert_eq!(window(None, None), (0, 30));
        assert_eq!(window(Some(5), None), (5, 35));
        assert_eq!(window(Some(5), Some(3)), (5, 6));
        assert_eq!(window(Some(-2), Some(2000)), (0, 1000));
    }

    #[test]
    fn test_laws_hold_over_a_grid() {
        let policy = PaginationPolicy::default();
        let samples = [None, Some(-50), Some(-1), Some(0), Some(1), Some(29), Some(999), Some(1000), Some(5000)];
        for from in samples {
            for to in samples {
                let info = policy.calculate(from, to);
                assert!(info.from < info.to, "{:?}/{:?} -> {:?}", from, to, info);
                assert!(info.to <= MAX_TO, "{:?}/{:?} -> {:?}", from, to, info);
                assert_eq!(info.search_size, info.requested_size + 1);
                assert_eq!(info.requested_size, info.to - info.from);
            }
        }
    }

    #[test]
    fn test_from_beyond_cap_still_yields_a_window() {
        assert_eq!(window(Some(5000), None), (999, 1000));
        assert_eq!(window(Some(990), None), (990, 1000));
    }

    #[test]
    fn test_custom_policy() {
        let policy = PaginationPolicy {
            default_page_size: 10,
            max_to: 50,
        };
        let info = policy.calculate(Some(45), None);
        assert_eq!((info.from, info.to, info.search_size), (45, 50, 6));
    }

    #[test]
    fn test_paginate_trims_lookahead() {
        let page = paginate(vec![1, 2, 3, 4], 3);
        assert_eq!(page.data, vec![1, 2, 3]);
        assert!(page.has_next);

        let page = paginate(vec![1, 2], 3);
        assert_eq!(page.data, vec![1, 2]);
        assert!(!page.has_next);

        let page = paginate(vec![1, 2, 3], 3);
        assert!(!page.has_next);
    }
}
