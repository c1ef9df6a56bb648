//! Cursor pagination over an ordered sequence.

use super::cursor::{Cursor, CursorError};
use super::link::build_link_header;

/// One page of results.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Length of the whole sequence, not the page.
    pub total: usize,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
    /// `rel="next"` / `rel="prev"` links; `None` when there are neither.
    pub link_header: Option<String>,
}

/// Slices sequences into pages for one collection.
///
/// ```rust
/// use conneg::pagination::Paginator;
///
/// let ids: Vec<String> = (1..=7).map(|i| format!("id-{i}")).collect();
/// let paginator = Paginator::new("item", "/items");
///
/// let first = paginator.paginate(&ids, None, 3, |id| id.as_str()).unwrap();
/// assert_eq!(first.items, ["id-1", "id-2", "id-3"]);
///
/// let second = paginator
///     .paginate(&ids, first.next_cursor.as_deref(), 3, |id| id.as_str())
///     .unwrap();
/// assert_eq!(second.items, ["id-4", "id-5", "id-6"]);
/// ```
#[derive(Clone, Debug)]
pub struct Paginator {
    kind: String,
    base_path: String,
    query: Vec<(String, String)>,
}

impl Paginator {
    /// `kind` tags every cursor this paginator issues; cursors with another
    /// tag are refused.
    pub fn new(kind: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self { kind: kind.into(), base_path: base_path.into(), query: Vec::new() }
    }

    /// A filter parameter to carry into the `Link` URLs.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Returns the page following `cursor`.
    ///
    /// A cursor whose id is no longer in `items` restarts at the first page.
    pub fn paginate<T, F>(
        &self,
        items: &[T],
        cursor: Option<&str>,
        limit: usize,
        id_of: F,
    ) -> Result<Page<T>, CursorError>
    where
        T: Clone,
        F: Fn(&T) -> &str,
    {
        let start = match cursor.filter(|c| !c.is_empty()) {
            None => 0,
            Some(raw) => {
                let cursor = Cursor::decode_expecting(raw, &self.kind)?;
                items
                    .iter()
                    .position(|item| id_of(item) == cursor.value)
                    .map_or(0, |i| i + 1)
            }
        };

        let end = start.saturating_add(limit).min(items.len());
        let page: Vec<T> = items.get(start..end).unwrap_or_default().to_vec();

        let next_cursor = match page.last() {
            Some(last) if start.saturating_add(limit) < items.len() => Some(self.cursor(id_of(last))),
            _ => None,
        };

        let prev_cursor = if start == 0 {
            None
        } else if start <= limit {
            Some(self.cursor(""))
        } else {
            Some(self.cursor(id_of(&items[start - limit - 1])))
        };

        let mut query = self.query.clone();
        query.push(("limit".to_owned(), limit.to_string()));
        let link_header = build_link_header(&self.base_path, &query, next_cursor.as_deref(), prev_cursor.as_deref());

        Ok(Page { items: page, total: items.len(), next_cursor, prev_cursor, link_header })
    }

    fn cursor(&self, value: &str) -> String {
        Cursor::new(self.kind.as_str(), value).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: String,
    }

    fn items(n: usize) -> Vec<Item> {
        (1..=n).map(|i| Item { id: format!("item-{i:03}") }).collect()
    }

    fn ids(page: &Page<Item>) -> Vec<&str> {
        page.items.iter().map(|i| i.id.as_str()).collect()
    }

    fn id(item: &Item) -> &str {
        &item.id
    }

    #[test]
    fn first_page_has_next_only() {
        let all = items(30);
        let page = Paginator::new("item", "/items").paginate(&all, None, 5, id).unwrap();
        assert_eq!(ids(&page), ["item-001", "item-002", "item-003", "item-004", "item-005"]);
        assert_eq!(page.total, 30);
        assert_eq!(page.next_cursor, Some(Cursor::new("item", "item-005").encode()));
        assert_eq!(page.prev_cursor, None);
        let link = page.link_header.unwrap();
        assert!(link.contains(r#"rel="next""#));
        assert!(!link.contains(r#"rel="prev""#));
    }

    #[test]
    fn forward_walk_visits_everything_once() {
        let all = items(23);
        let paginator = Paginator::new("item", "/items");
        for limit in [1, 2, 5, 7, 22, 23, 50] {
            let mut seen = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let page = paginator.paginate(&all, cursor.as_deref(), limit, id).unwrap();
                seen.extend(page.items.iter().map(|i| i.id.clone()));
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
            let expected: Vec<String> = all.iter().map(|i| i.id.clone()).collect();
            assert_eq!(seen, expected, "limit {limit}");
        }
    }

    #[test]
    fn thirty_items_five_hops() {
        let all = items(30);
        let paginator = Paginator::new("item", "/items");
        let mut page = paginator.paginate(&all, None, 5, id).unwrap();
        for _ in 0..5 {
            page = paginator.paginate(&all, page.next_cursor.as_deref(), 5, id).unwrap();
        }
        assert_eq!(ids(&page), ["item-026", "item-027", "item-028", "item-029", "item-030"]);
        assert_eq!(page.next_cursor, None);

        let prev = Cursor::decode(page.prev_cursor.as_deref().unwrap()).unwrap();
        assert_eq!(prev, Cursor::new("item", "item-020"));

        let back = paginator.paginate(&all, page.prev_cursor.as_deref(), 5, id).unwrap();
        assert_eq!(ids(&back), ["item-021", "item-022", "item-023", "item-024", "item-025"]);
    }

    #[test]
    fn second_page_prev_points_at_page_one() {
        let all = items(10);
        let paginator = Paginator::new("item", "/items");
        let first = paginator.paginate(&all, None, 4, id).unwrap();
        let second = paginator.paginate(&all, first.next_cursor.as_deref(), 4, id).unwrap();

        let prev = second.prev_cursor.unwrap();
        assert_eq!(Cursor::decode(&prev).unwrap(), Cursor::new("item", ""));
        let again = paginator.paginate(&all, Some(&prev), 4, id).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn limit_covering_everything() {
        let all = items(4);
        let page = Paginator::new("item", "/items").paginate(&all, None, 4, id).unwrap();
        assert_eq!(page.items.len(), 4);
        assert_eq!(page.next_cursor, None);
        assert_eq!(page.link_header, None);
    }

    #[test]
    fn cursor_at_last_item_yields_empty_page() {
        let all = items(4);
        let last = Cursor::new("item", "item-004").encode();
        let page = Paginator::new("item", "/items").paginate(&all, Some(&last), 2, id).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next_cursor, None);
        assert!(page.prev_cursor.is_some());
    }

    #[test]
    fn unknown_id_restarts_silently() {
        let all = items(6);
        let stale = Cursor::new("item", "deleted").encode();
        let page = Paginator::new("item", "/items").paginate(&all, Some(&stale), 3, id).unwrap();
        assert_eq!(ids(&page), ["item-001", "item-002", "item-003"]);
    }

    #[test]
    fn wrong_kind_and_garbage_are_errors() {
        let all = items(3);
        let paginator = Paginator::new("item", "/items");
        let foreign = Cursor::new("dog", "item-001").encode();
        assert_eq!(
            paginator.paginate(&all, Some(&foreign), 2, id).unwrap_err(),
            CursorError::WrongType { expected: "item".into() }
        );
        assert_eq!(paginator.paginate(&all, Some("%%%"), 2, id).unwrap_err(), CursorError::Malformed);
    }

    #[test]
    fn links_carry_filters_and_limit() {
        let all = items(6);
        let page = Paginator::new("item", "/items")
            .query_param("category", "tools")
            .paginate(&all, None, 2, id)
            .unwrap();
        let next = page.next_cursor.unwrap();
        assert_eq!(
            page.link_header.unwrap(),
            format!(r#"</items?category=tools&limit=2&cursor={next}>; rel="next""#)
        );
    }
}
