use std::collections::VecDeque;
use super::types::Score;

/// Keeps at most `target_count` items, favouring low scores, in a single pass.
///
/// This is an approximation, not an exact bottom-K: an item is kept when its
/// score is at most the lowest score seen so far (it goes to the front and, if
/// the result is full, the back item is dropped), or when it beats the highest
/// score appended so far while there is still room (it goes to the back).
/// Anything else is dropped, so the outcome depends on input order. Callers
/// shuffle beforehand to spread that bias.
pub fn select_best<T, I, F>(items: I, target_count: usize, mut scorer: F) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> Score,
{
    let mut result: VecDeque<T> = VecDeque::with_capacity(target_count.saturating_add(1).min(4096));
    let mut min_score = Score::MAX;
    let mut max_score: Score = 0;

    for item in items {
        let score = scorer(&item);

        if score <= min_score {
            min_score = score;
            result.push_front(item);
            if result.len() > target_count {
                result.pop_back();
            }
        } else if score > max_score && result.len() < target_count {
            max_score = score;
            result.push_back(item);
        }
    }

    result.into()
}
