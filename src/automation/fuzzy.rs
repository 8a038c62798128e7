//! Edit-distance similarity ratios on a 0-100 scale.
//!
//! Both functions work on Unicode scalar values, so Vietnamese diacritics
//! count as one character each.

/// Length of the longest common subsequence of `a` and `b`.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Single rolling row over b
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diag + 1
            } else {
                above.max(row[j])
            };
            diag = above;
        }
    }
    row[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // (total - indel) / total, where indel = total - 2 * lcs
    let similarity = 2.0 * lcs_len(a, b) as f64 / total as f64;
    (similarity * 100.0).round() as u8
}

/// Indel-distance similarity between two strings (symmetric).
/// Returns 0 when either string is empty.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best `ratio` of the shorter string against every same-length window of
/// the longer one. Tolerates one string being a substring of the other.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    if shorter.is_empty() {
        return 0;
    }

    let mut best = 0;
    for window in longer.windows(shorter.len()) {
        let score = ratio_chars(shorter, window);
        if score > best {
            best = score;
            if best == 100 {
                break;
            }
        }
    }
    best
}
