//! "Did you mean" lookups shared by flags, registries and commands.

use strsim::levenshtein;

/// Default edit-distance threshold for suggestions.
pub const DEFAULT_DISTANCE: usize = 2;

/// Return the candidate closest to `input` within `max_distance` edits.
///
/// A threshold of zero disables suggestions. Ties go to the candidate seen
/// first, so callers control precedence through iteration order.
pub fn closest<'a, I>(input: &str, candidates: I, max_distance: usize) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if max_distance == 0 {
        return None;
    }

    let mut best: Option<(&'a str, usize)> = None;
    for candidate in candidates {
        let distance = levenshtein(input, candidate);
        if distance > max_distance {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }

    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_nearest_within_threshold() {
        let names = ["serve", "status", "build"];
        assert_eq!(closest("srve", names, 2), Some("serve"));
        assert_eq!(closest("biuld", names, 2), Some("build"));
        assert_eq!(closest("deploy", names, 2), None);
    }

    #[test]
    fn zero_threshold_disables() {
        assert_eq!(closest("serve", ["serve"], 0), None);
    }

    #[test]
    fn ties_keep_first_candidate() {
        assert_eq!(closest("cat", ["bat", "hat"], 1), Some("bat"));
        assert_eq!(closest("cat", ["hat", "bat"], 1), Some("hat"));
    }
}
