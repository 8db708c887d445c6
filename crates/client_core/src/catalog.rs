//! In-memory search and paging over an already fetched product list.

use shared::domain::Product;

use crate::paging::total_pages;

#[derive(Debug, PartialEq)]
pub struct LocalPage<'a, T> {
    pub items: &'a [T],
    pub page: u32,
    pub total_pages: u32,
    pub total_count: usize,
}

/// Case-insensitive match on title or category. A blank term keeps everything.
pub fn filter_products<'a>(products: &'a [Product], term: &str) -> Vec<&'a Product> {
    let term = term.trim().to_lowercase();
    products
        .iter()
        .filter(|product| {
            term.is_empty()
                || product.title.to_lowercase().contains(&term)
                || product.category.to_lowercase().contains(&term)
        })
        .collect()
}

pub fn paginate_local<T>(items: &[T], page: u32, page_size: u32) -> LocalPage<'_, T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len() as u64, page_size);
    let start = (page.max(1) as usize - 1).saturating_mul(page_size as usize);
    let slice = if page < 1 || page > total_pages || start >= items.len() {
        &items[..0]
    } else {
        let end = start.saturating_add(page_size as usize).min(items.len());
        &items[start..end]
    };
    LocalPage {
        items: slice,
        page,
        total_pages,
        total_count: items.len(),
    }
}
