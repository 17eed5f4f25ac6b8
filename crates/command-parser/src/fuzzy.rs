//! Edit-distance helpers used to tolerate typos in command words

/// Levenshtein distance with unit cost for insertion, deletion and substitution.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            let insertion = current[j] + 1;
            let deletion = previous[j + 1] + 1;
            current[j + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Return the candidate closest to `word` within `max_distance`, with its distance.
///
/// Only a strictly smaller distance replaces the current best, so ties keep
/// the first candidate in table order.
pub fn closest_match<'a>(
    word: &str,
    candidates: &[&'a str],
    max_distance: usize,
) -> Option<(&'a str, usize)> {
    let word = word.to_lowercase();
    let mut best: Option<(&'a str, usize)> = None;

    for &candidate in candidates {
        let distance = edit_distance(&word, &candidate.to_lowercase());
        if distance > max_distance {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }

    best
}

/// Return the candidate closest to `word` within `max_distance`.
pub fn find_best_match<'a>(
    word: &str,
    candidates: &[&'a str],
    max_distance: usize,
) -> Option<&'a str> {
    closest_match(word, candidates, max_distance).map(|(candidate, _)| candidate)
}
