//! Token-order-insensitive string similarity on a 0–100 scale.
//!
//! Both inputs are pre-processed (lowercased, punctuation turned into spaces,
//! whitespace collapsed) and then compared with several Levenshtein-based
//! ratios; the best one wins. Token-based ratios are discounted slightly so an
//! exact character match always outranks a mere reordering.

use std::collections::BTreeSet;

use strsim::normalized_levenshtein;

const TOKEN_SCALE: f64 = 0.95;
const PARTIAL_SCALE: f64 = 0.9;
const FAR_PARTIAL_SCALE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Similarity {
    fold_diacritics: bool,
}

impl Similarity {
    /// Diacritics are significant: `h` and `ḥ` are different letters.
    pub const fn strict() -> Self {
        Self { fold_diacritics: false }
    }

    /// IAST diacritics fold to their base letters before comparison, so a
    /// romanization without diacritics still lands close to the gold spelling.
    pub const fn folding() -> Self {
        Self { fold_diacritics: true }
    }

    pub fn score(&self, a: &str, b: &str) -> f64 {
        let a = process(a, self.fold_diacritics);
        let b = process(b, self.fold_diacritics);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let base = ratio(&a, &b);
        let len_a = a.chars().count() as f64;
        let len_b = b.chars().count() as f64;
        let len_ratio = len_a.max(len_b) / len_a.min(len_b);

        if len_ratio < 1.5 {
            let sorted = token_sort_ratio(&a, &b) * TOKEN_SCALE;
            let set = token_set_ratio(&a, &b) * TOKEN_SCALE;
            return base.max(sorted).max(set);
        }

        let scale = if len_ratio < 8.0 { PARTIAL_SCALE } else { FAR_PARTIAL_SCALE };
        let partial = partial_ratio(&a, &b) * scale;
        let set = token_set_ratio(&a, &b) * TOKEN_SCALE * scale;
        base.max(partial).max(set)
    }
}

/// Lowercase, optionally fold diacritics, replace non-alphanumerics with
/// spaces and collapse runs of whitespace.
pub fn process(s: &str, fold_diacritics: bool) -> String {
    let lowered = s.to_lowercase();
    let folded = if fold_diacritics { fold_iast(&lowered) } else { lowered };
    let spaced: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace IAST letters with their unmarked base letters and drop combining marks.
pub fn fold_iast(s: &str) -> String {
    s.chars()
        .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
        .map(|c| match c {
            'ā' | 'á' | 'à' | 'â' => 'a',
            'ī' | 'í' | 'ì' | 'î' => 'i',
            'ū' | 'ú' | 'ù' | 'û' => 'u',
            'ṛ' | 'ṝ' => 'r',
            'ḷ' | 'ḹ' => 'l',
            'ṃ' | 'ṁ' => 'm',
            'ḥ' => 'h',
            'ñ' | 'ṅ' | 'ṇ' => 'n',
            'ṭ' => 't',
            'ḍ' => 'd',
            'ś' | 'ṣ' => 's',
            'ē' => 'e',
            'ō' => 'o',
            other => other,
        })
        .collect()
}

fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    // One side's tokens are a subset of the other's.
    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let sect = intersection.join(" ");
    let combined_ab = join_nonempty(&sect, &diff_ab.join(" "));
    let combined_ba = join_nonempty(&sect, &diff_ba.join(" "));

    ratio(&sect, &combined_ab)
        .max(ratio(&sect, &combined_ba))
        .max(ratio(&combined_ab, &combined_ba))
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a} {b}"),
    }
}

/// Best ratio of the shorter string against every equally long window of the longer one.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    let long_chars: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    if width == 0 {
        return 0.0;
    }

    let mut best = 0.0f64;
    for start in 0..=(long_chars.len() - width) {
        let window: String = long_chars[start..start + width].iter().collect();
        best = best.max(ratio(short, &window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_after_processing() {
        let sim = Similarity::strict();
        assert_eq!(sim.score("Tantrāloka", "  tantrāloka "), 100.0);
        assert_eq!(sim.score("bhū + lam̐ṭ", "bhū + lam̐ṭ"), 100.0);
    }

    #[test]
    fn test_empty_is_zero() {
        let sim = Similarity::strict();
        assert_eq!(sim.score("", "kalidasa"), 0.0);
        assert_eq!(sim.score("  ", "  "), 0.0);
    }

    #[test]
    fn test_token_order_insensitive() {
        let sim = Similarity::strict();
        let score = sim.score("vairagya sataka", "sataka vairagya");
        assert!(score >= 90.0, "got {score}");
    }

    #[test]
    fn test_folding_bridges_diacritics() {
        assert!(Similarity::strict().score("nagarjuna", "nāgārjuna") < 80.0);
        assert_eq!(Similarity::folding().score("nagarjuna", "nāgārjuna"), 100.0);
    }

    #[test]
    fn test_strict_keeps_visarga() {
        assert!(Similarity::strict().score("bhavatah", "bhavataḥ") < 95.0);
    }

    #[test]
    fn test_unrelated_names_stay_low() {
        let sim = Similarity::folding();
        assert!(sim.score("kalidasa", "abhinavagupta") < 80.0);
        assert!(sim.score("meghaduta", "tantraloka") < 80.0);
    }

    #[test]
    fn test_partial_match_for_longer_title() {
        let sim = Similarity::folding();
        let score = sim.score("tantraloka", "the tantraloka of abhinavagupta");
        assert!(score >= 80.0, "got {score}");
    }

    #[test]
    fn test_fold_iast() {
        assert_eq!(fold_iast("ṛgvedaḥ"), "rgvedah");
        assert_eq!(fold_iast("lam̐ṭ"), "lamt");
    }
}
