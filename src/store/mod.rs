pub mod audit_logs;
pub mod bootstrap;
pub mod contacts;
pub mod deals;
pub mod memberships;
pub mod pool;
pub mod scope;
pub mod settings;
pub mod stages;
pub mod tenants;
pub mod users;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;

pub use scope::TenantId;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

/// `%term%` for a `LIKE ... ESCAPE '\'` substring match, with the pattern
/// metacharacters in `term` escaped so they match literally.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Page/page-size window used by the paginated listings.
///
/// Out-of-range input is clamped rather than rejected: a page below 1 becomes
/// 1, a non-positive size falls back to 10 and sizes above 100 are capped.
/// The page is capped at [`Page::MAX_PAGE`] so the offset cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub page_size: i64,
}

impl Page {
    pub const MAX_SIZE: i64 = 100;
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_SIZE;

    pub fn new(page: Option<i64>, page_size: Option<i64>, default_size: i64) -> Self {
        let page = page.unwrap_or(1).clamp(1, Self::MAX_PAGE);
        let page_size = match page_size.unwrap_or(default_size) {
            n if n <= 0 => 10,
            n => n.min(Self::MAX_SIZE),
        };
        Self { page, page_size }
    }

    pub fn limit(self) -> i64 {
        self.page_size
    }

    pub fn offset(self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn total_pages(self, total: i64) -> i64 {
        (total + self.page_size - 1) / self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 20, 1, 20)]
    #[case(Some(0), Some(0), 20, 1, 10)]
    #[case(Some(-3), Some(-1), 20, 1, 10)]
    #[case(Some(2), Some(500), 20, 2, 100)]
    #[case(Some(4), Some(25), 20, 4, 25)]
    #[case(Some(i64::MAX), Some(20), 20, Page::MAX_PAGE, 20)]
    fn page_clamping(
        #[case] page: Option<i64>,
        #[case] size: Option<i64>,
        #[case] default_size: i64,
        #[case] want_page: i64,
        #[case] want_size: i64,
    ) {
        let p = Page::new(page, size, default_size);
        assert_eq!(p.page, want_page);
        assert_eq!(p.page_size, want_size);
    }

    #[test]
    fn offset_follows_page() {
        let p = Page::new(Some(3), Some(20), 10);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[rstest]
    #[case(Some(i64::MAX), Some(100))]
    #[case(Some(i64::MAX), Some(1))]
    #[case(Some(Page::MAX_PAGE), Some(100))]
    fn huge_page_offset_stays_positive(#[case] page: Option<i64>, #[case] size: Option<i64>) {
        let p = Page::new(page, size, 20);
        assert!(p.offset() >= 0);
        assert!(p.offset() <= i64::MAX - p.limit());
    }

    #[rstest]
    #[case("acme", "%acme%")]
    #[case("50%", "%50\\%%")]
    #[case("a_b", "%a\\_b%")]
    #[case(r"c:\\x", r"%c:\\\\x%")]
    #[case("", "%%")]
    fn contains_pattern_escapes_metacharacters(#[case] term: &str, #[case] want: &str) {
        assert_eq!(contains_pattern(term), want);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(20, 1)]
    #[case(21, 2)]
    fn total_pages_rounds_up(#[case] total: i64, #[case] pages: i64) {
        assert_eq!(Page::new(None, Some(20), 20).total_pages(total), pages);
    }
}
