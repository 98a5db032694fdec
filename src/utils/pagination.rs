use serde::Serialize;

/// 未指定或非法时的每页条数
pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// 每页条数上限
pub const MAX_PAGE_SIZE: u64 = 100;

/// 分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    /// 当前页码（>= 1）
    pub page: u64,
    /// 每页条数（1..=100）
    pub limit: u64,
}

impl PaginationParams {
    /// 规范化调用方传入的页码和条数
    ///
    /// 页码小于 1 视为 1；条数小于 1 使用默认值 10，大于 100 截断为 100。
    #[must_use]
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = u64::try_from(page).unwrap_or(0).max(1);
        let limit = match u64::try_from(page_size) {
            Ok(0) | Err(_) => DEFAULT_PAGE_SIZE,
            Ok(size) => size.min(MAX_PAGE_SIZE),
        };
        Self { page, limit }
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// 标准分页信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

/// 计算 `(offset, limit)`
#[must_use]
pub fn paginate(page: i64, page_size: i64) -> (u64, u64) {
    let params = PaginationParams::new(page, page_size);
    (params.offset(), params.limit)
}

/// 总页数，总数为 0 时返回 0
#[must_use]
pub const fn total_pages(total: u64, page_size: u64) -> u64 {
    if total == 0 || page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// 根据总数和分页参数计算分页信息。
#[must_use]
pub const fn build_page(total: u64, params: PaginationParams) -> PaginationInfo {
    PaginationInfo {
        page: params.page,
        limit: params.limit,
        total,
        pages: total_pages(total, params.limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 10, (0, 10))]
    #[case(3, 20, (40, 20))]
    #[case(0, 10, (0, 10))]
    #[case(-5, 10, (0, 10))]
    #[case(2, 0, (10, 10))]
    #[case(2, -1, (10, 10))]
    #[case(2, 500, (100, 100))]
    fn test_paginate(#[case] page: i64, #[case] size: i64, #[case] expected: (u64, u64)) {
        assert_eq!(paginate(page, size), expected);
    }

    #[rstest]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    #[case(101, 20, 6)]
    fn test_total_pages(#[case] total: u64, #[case] size: u64, #[case] expected: u64) {
        assert_eq!(total_pages(total, size), expected);
    }

    #[test]
    fn test_build_page() {
        let info = build_page(45, PaginationParams::new(2, 20));
        assert_eq!(
            info,
            PaginationInfo {
                page: 2,
                limit: 20,
                total: 45,
                pages: 3
            }
        );
    }

    proptest! {
        #[test]
        fn prop_limit_always_in_range(page in -1_000i64..1_000_000, size in any::<i64>()) {
            let (offset, limit) = paginate(page, size);
            prop_assert!((1..=MAX_PAGE_SIZE).contains(&limit));
            prop_assert_eq!(offset % limit, 0);
        }

        #[test]
        fn prop_pages_cover_total(total in 0u64..1_000_000, size in 1u64..=100) {
            let pages = total_pages(total, size);
            prop_assert!(pages * size >= total);
            if total > 0 {
                prop_assert!((pages - 1) * size < total);
            }
        }
    }
}
