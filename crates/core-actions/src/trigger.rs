use core_text::{byte_to_char, char_len, slice_chars};

/// Start offset of the text trigger that activates at `cursor`, if any.
///
/// Only the last occurrence of `trigger` before the cursor is considered; it
/// activates when it starts the text or follows whitespace. An empty trigger
/// never activates.
pub fn check_text_trigger(text: &str, cursor: usize, trigger: &str) -> Option<usize> {
    if trigger.is_empty() {
        return None;
    }
    let prefix = slice_chars(text, 0, cursor.min(char_len(text)));
    let byte = prefix.rfind(trigger)?;
    let boundary = byte == 0
        || prefix[..byte]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
    boundary.then(|| byte_to_char(prefix, byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matches_at_start_and_after_whitespace() {
        assert_eq!(check_text_trigger("AI:", 3, "AI:"), Some(0));
        assert_eq!(check_text_trigger("AI:Gre", 6, "AI:"), Some(0));
        assert_eq!(check_text_trigger("say AI:x", 8, "AI:"), Some(4));
        assert_eq!(check_text_trigger("line\nAI:", 8, "AI:"), Some(5));
    }

    #[test]
    fn rejects_mid_word_and_incomplete() {
        assert_eq!(check_text_trigger("xAI:", 4, "AI:"), None);
        assert_eq!(check_text_trigger("AI:", 2, "AI:"), None);
        assert_eq!(check_text_trigger("anything", 8, ""), None);
    }

    #[test]
    fn only_the_last_occurrence_counts() {
        // The later occurrence is glued to a word, so nothing activates.
        assert_eq!(check_text_trigger("AI: fooAI:", 10, "AI:"), None);
        // The cursor limits which occurrence is last.
        assert_eq!(check_text_trigger("AI: fooAI:", 4, "AI:"), Some(0));
    }

    #[test]
    fn offsets_are_chars() {
        assert_eq!(check_text_trigger("\u{e9}t\u{e9} AI:", 7, "AI:"), Some(4));
        assert_eq!(check_text_trigger("\u{1f600} ;;x", 5, ";;"), Some(2));
    }

    fn oracle(text: &str, cursor: usize, trigger: &str) -> Option<usize> {
        let chars: Vec<char> = text.chars().collect();
        let t: Vec<char> = trigger.chars().collect();
        let cursor = cursor.min(chars.len());
        let last = (0..=cursor.checked_sub(t.len())?)
            .rev()
            .find(|&i| chars[i..i + t.len()] == t[..])?;
        (last == 0 || chars[last - 1].is_whitespace()).then_some(last)
    }

    proptest! {
        #[test]
        fn agrees_with_char_scan(
            text in "[ab: \\n\u{e9}]{0,24}",
            cursor in 0usize..30,
            trigger in "[ab:]{1,3}",
        ) {
            prop_assert_eq!(check_text_trigger(&text, cursor, &trigger), oracle(&text, cursor, &trigger));
        }
    }
}
