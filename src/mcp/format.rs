//! Response formatting helpers.
//!
//! Anki conventions handled here: `::` separates parent and subdeck in a
//! deck name, and card questions/answers arrive as rendered HTML.

use std::collections::BTreeMap;

/// Deck hierarchy separator used by Anki.
pub const DECK_SEPARATOR: &str = "::";

/// Split deck names into top-level decks and parent buckets.
///
/// A name containing `::` lands in the bucket of its first segment and
/// nowhere else; a name without `::` appears only in the top-level list.
pub fn group_decks(names: &[String]) -> (Vec<String>, BTreeMap<String, Vec<String>>) {
    let mut top_level = Vec::new();
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for name in names {
        match name.split_once(DECK_SEPARATOR) {
            Some((parent, _)) => {
                grouped.entry(parent.to_string()).or_default().push(name.clone());
            }
            None => top_level.push(name.clone()),
        }
    }

    (top_level, grouped)
}

/// Render a deck listing with subdecks grouped under their parent.
pub fn format_deck_list(names: &[String]) -> String {
    if names.is_empty() {
        return "No decks found.".to_string();
    }

    let (top_level, grouped) = group_decks(names);
    let mut out = format!("📚 {} deck(s):\n", names.len());

    for deck in &top_level {
        out.push_str(&format!("- {}\n", deck));
    }
    for (parent, children) in &grouped {
        out.push_str(&format!("- {} ({} subdeck(s)):\n", parent, children.len()));
        for child in children {
            out.push_str(&format!("  - {}\n", child));
        }
    }

    out
}

/// Strip HTML tags and collapse whitespace.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;

    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }

    // Rendered cards are full of &nbsp; and layout whitespace.
    let out = out.replace("&nbsp;", " ").replace("&amp;", "&");
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to a character budget, appending an ellipsis when cut.
pub fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let cut: String = input.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// Strip HTML then truncate; the shape every card preview goes through.
pub fn preview(html: &str, max_chars: usize) -> String {
    truncate(&strip_html(html), max_chars)
}

/// Fixed label for a review ease value. Values outside 1–4 have none.
pub fn ease_label(ease: u64) -> Option<&'static str> {
    match ease {
        1 => Some("Again ❌"),
        2 => Some("Hard 😓"),
        3 => Some("Good 👍"),
        4 => Some("Easy 🎉"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_group_decks_by_separator() {
        let decks = names(&[
            "Default",
            "Japanese::Vocab",
            "Japanese::Kanji",
            "Spanish",
        ]);
        let (top_level, grouped) = group_decks(&decks);

        assert_eq!(top_level, vec!["Default", "Spanish"]);
        assert_eq!(
            grouped.get("Japanese").unwrap(),
            &vec!["Japanese::Vocab", "Japanese::Kanji"]
        );
    }

    #[test]
    fn test_plain_name_only_top_level() {
        let decks = names(&["Default"]);
        let (top_level, grouped) = group_decks(&decks);

        assert_eq!(top_level, vec!["Default"]);
        assert!(grouped.is_empty());
    }

    #[test]
    fn test_nested_subdeck_buckets_under_first_segment() {
        let decks = names(&["Japanese::Kanji::N5"]);
        let (top_level, grouped) = group_decks(&decks);

        assert!(top_level.is_empty());
        assert_eq!(
            grouped.get("Japanese").unwrap(),
            &vec!["Japanese::Kanji::N5"]
        );
    }

    #[test]
    fn test_format_deck_list_empty() {
        assert_eq!(format_deck_list(&[]), "No decks found.");
    }

    #[test]
    fn test_strip_html() {
        let html = r#"<div class="front">What is <b>Rust</b>?&nbsp;</div>"#;
        assert_eq!(strip_html(html), "What is Rust?");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("ねこはかわいい", 3), "ねこは…");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_ease_labels() {
        assert_eq!(ease_label(1), Some("Again ❌"));
        assert_eq!(ease_label(2), Some("Hard 😓"));
        assert_eq!(ease_label(3), Some("Good 👍"));
        assert_eq!(ease_label(4), Some("Easy 🎉"));
        assert_eq!(ease_label(0), None);
        assert_eq!(ease_label(5), None);
        // Values past one byte must not wrap back onto a label.
        assert_eq!(ease_label(257), None);
    }
}
