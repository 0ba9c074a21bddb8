use clap::ValueEnum;

/// How a page of pro match ids is ordered before the cursor is taken from it.
///
/// `Lexicographic` compares ids as strings, so `"100"` sorts before `"55"`.
/// With ids of equal digit count (the live feed today) both orders agree; when
/// lengths differ the string order can pick a cursor that is not the page's
/// smallest id and later rounds revisit or skip matches. `Numeric` compares
/// the integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CursorOrder {
    #[default]
    Lexicographic,
    Numeric,
}

pub fn sort_page(mut ids: Vec<String>, order: CursorOrder) -> Vec<String> {
    match order {
        CursorOrder::Lexicographic => ids.sort(),
        CursorOrder::Numeric => {
            ids.sort_by(|a, b| match (a.parse::<i64>(), b.parse::<i64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            })
        }
    }
    ids
}

/// The next page asks for ids strictly below the first id of the sorted page.
pub fn next_cursor(sorted_page: &[String]) -> Option<String> {
    sorted_page.first().cloned()
}

/// A cap of zero or less keeps everything.
pub fn cap_matches<T>(mut items: Vec<T>, max: i64) -> Vec<T> {
    if max > 0 {
        let max = usize::try_from(max).unwrap_or(usize::MAX);
        items.truncate(max);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lexicographic_order_puts_longer_id_first() {
        let sorted = sort_page(page(&["100", "55", "9"]), CursorOrder::Lexicographic);
        assert_eq!(sorted, page(&["100", "55", "9"]));
        assert_eq!(next_cursor(&sorted).as_deref(), Some("100"));
    }

    #[test]
    fn numeric_order_picks_smallest_id() {
        let sorted = sort_page(page(&["100", "55", "9"]), CursorOrder::Numeric);
        assert_eq!(sorted, page(&["9", "55", "100"]));
        assert_eq!(next_cursor(&sorted).as_deref(), Some("9"));
    }

    #[test]
    fn orders_agree_on_equal_length_ids() {
        let ids = page(&["7412345678", "7412345001", "7412399999"]);
        assert_eq!(
            sort_page(ids.clone(), CursorOrder::Lexicographic),
            sort_page(ids, CursorOrder::Numeric)
        );
    }

    #[test]
    fn empty_page_has_no_cursor() {
        assert_eq!(next_cursor(&[]), None);
    }

    #[test]
    fn cap_keeps_leading_items_in_order() {
        let ids: Vec<i64> = (0..150).collect();
        let capped = cap_matches(ids, 100);
        assert_eq!(capped.len(), 100);
        assert_eq!(capped.first(), Some(&0));
        assert_eq!(capped.last(), Some(&99));
    }

    #[test]
    fn non_positive_cap_keeps_everything() {
        assert_eq!(cap_matches(vec![1, 2, 3], 0).len(), 3);
        assert_eq!(cap_matches(vec![1, 2, 3], -5).len(), 3);
        assert_eq!(cap_matches(vec![1, 2, 3], 10).len(), 3);
    }
}
