/// Generates every subset of `items` with exactly `length` elements.
///
/// Subsets keep the order of `items` and are emitted in lexicographic order of
/// positions, e.g. `combinations(&[1, 2, 3], 2)` yields `[1, 2], [1, 3], [2, 3]`.
/// A `length` of zero, or one larger than `items`, yields nothing.
pub fn combinations<T: Clone>(items: &[T], length: usize) -> Vec<Vec<T>> {
    let mut result = Vec::new();
    if length == 0 || length > items.len() {
        return result;
    }
    let mut current = Vec::with_capacity(length);
    generate(items, length, 0, &mut current, &mut result);
    result
}

fn generate<T: Clone>(
    items: &[T],
    length: usize,
    start: usize,
    current: &mut Vec<T>,
    result: &mut Vec<Vec<T>>,
) {
    // Stop early once the remaining items can no longer fill the subset
    let missing = length - current.len();
    for i in start..=items.len() - missing {
        current.push(items[i].clone());
        if current.len() == length {
            result.push(current.clone());
        } else {
            generate(items, length, i + 1, current, result);
        }
        current.pop();
    }
}
