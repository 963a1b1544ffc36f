// Person-name canonicalization, used as a join key when neither the
// resource nor the allocation table carries a resource identifier.

use once_cell::sync::Lazy;
use regex::Regex;

static HONORIFIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:dr|mr|mrs|ms|miss|prof)\.?\s+").expect("honorific pattern is valid")
});

/// Lowercase, drop one leading honorific, keep only letters and spaces and
/// collapse whitespace. `normalize_name(normalize_name(x)) == normalize_name(x)`.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped = HONORIFIC.replace(&lowered, "");
    let letters: String = stripped
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    let collapsed = letters.split_whitespace().collect::<Vec<_>>().join(" ");
    // A second title can surface once the first is gone ("dr. mr. x" -> "mr x");
    // keep going until the key is a fixed point.
    if HONORIFIC.is_match(&collapsed) {
        normalize_name(&collapsed)
    } else {
        collapsed
    }
}
