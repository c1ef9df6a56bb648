//! RFC 8288 `Link` header for cursor pagination.

/// Builds `<{base}?{query}>; rel="next", <…>; rel="prev"`.
///
/// `query` is re-serialized in order with `cursor` appended. Returns `None`
/// when neither cursor exists.
pub fn build_link_header(
    base_path: &str,
    query: &[(String, String)],
    next_cursor: Option<&str>,
    prev_cursor: Option<&str>,
) -> Option<String> {
    let links: Vec<String> = [(next_cursor, "next"), (prev_cursor, "prev")]
        .into_iter()
        .filter_map(|(cursor, rel)| {
            let cursor = cursor.filter(|c| !c.is_empty())?;
            Some(format!(r#"<{base_path}?{}>; rel="{rel}""#, encode_query(query, cursor)))
        })
        .collect();

    if links.is_empty() { None } else { Some(links.join(", ")) }
}

fn encode_query(query: &[(String, String)], cursor: &str) -> String {
    query
        .iter()
        .filter(|(k, _)| k != "cursor")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(std::iter::once(("cursor", cursor)))
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn none_without_cursors() {
        assert_eq!(build_link_header("/items", &q(&[("limit", "5")]), None, None), None);
    }

    #[test]
    fn next_and_prev_preserve_params() {
        let header = build_link_header(
            "/items",
            &q(&[("category", "power tools"), ("limit", "5")]),
            Some("bmV4dA"),
            Some("cHJldg"),
        )
        .unwrap();
        assert_eq!(
            header,
            r#"</items?category=power%20tools&limit=5&cursor=bmV4dA>; rel="next", </items?category=power%20tools&limit=5&cursor=cHJldg>; rel="prev""#
        );
    }

    #[test]
    fn stale_cursor_param_is_replaced() {
        let header = build_link_header("/items", &q(&[("cursor", "old"), ("limit", "2")]), Some("new"), None).unwrap();
        assert_eq!(header, r#"</items?limit=2&cursor=new>; rel="next""#);
    }
}
