use murmur_types::models::FeedItem;

/// Default share of original-authored content in an assembled feed.
pub const DEFAULT_ORIGINAL_RATIO: f64 = 0.6;

/// Merge the original and shared streams into one sequence that tracks a
/// target composition ratio over the cumulative output.
///
/// A plain reverse-chronological merge lets one prolific resharer flood a
/// page with reposts. Instead, each step compares the fraction of
/// originals emitted so far against `target_ratio` and takes from
/// whichever stream keeps the output on target, falling back to the other
/// stream when one runs dry. Relative order within each stream is
/// preserved and the output length is always the sum of the input
/// lengths. The ratio is a soft target: once a stream is exhausted the
/// tail is whatever remains of the other.
pub fn interleave(
    original: Vec<FeedItem>,
    shared: Vec<FeedItem>,
    target_ratio: f64,
) -> Vec<FeedItem> {
    let mut originals = original.into_iter();
    let mut shares = shared.into_iter();
    let mut result = Vec::with_capacity(originals.len() + shares.len());
    let mut original_count = 0usize;

    while originals.len() > 0 || shares.len() > 0 {
        let current_ratio = if result.is_empty() {
            0.0
        } else {
            original_count as f64 / result.len() as f64
        };

        let want_original =
            (current_ratio < target_ratio && originals.len() > 0) || shares.len() == 0;

        if want_original {
            if let Some(item) = originals.next() {
                original_count += 1;
                result.push(item);
                continue;
            }
        }
        match shares.next() {
            Some(item) => result.push(item),
            None => break, // unreachable given the loop guard
        }
    }

    result
}

/// Slice an interleaved list into a 1-indexed page. Out-of-range pages
/// yield an empty vec, never an error. Applied after interleaving so the
/// ratio is computed over the whole merged candidate set rather than per
/// page.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> Vec<T> {
    let start = page.saturating_sub(1).saturating_mul(limit);
    items.into_iter().skip(start).take(limit).collect()
}
