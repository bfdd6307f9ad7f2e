/// Short display title for a zone: `name`, or `class` when the name is
/// missing, empty or `"nan"`, reduced to its first word without commas.
pub fn zone_title(name: Option<&str>, class: Option<&str>) -> String {
    let usable = |value: &&str| {
        let trimmed = value.trim();
        !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("nan")
    };

    let source = name
        .filter(usable)
        .or_else(|| class.filter(usable))
        .unwrap_or_default();

    source
        .trim()
        .split(' ')
        .next()
        .unwrap_or_default()
        .replace(',', "")
}

/// Shortens `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let mut shortened = text.chars().take(max_chars.saturating_sub(1)).collect::<String>();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_word_without_commas() {
        assert_eq!(zone_title(Some("Bourg, quartier"), None), "Bourg");
        assert_eq!(zone_title(Some("Ouchy"), Some("Port")), "Ouchy");
    }

    #[test]
    fn falls_back_to_class() {
        assert_eq!(zone_title(Some("nan"), Some("Forêt communale")), "Forêt");
        assert_eq!(zone_title(Some(""), Some("Vignes")), "Vignes");
        assert_eq!(zone_title(None, Some("Champs,")), "Champs");
        assert_eq!(zone_title(None, None), "");
    }

    #[test]
    fn truncation_keeps_short_labels() {
        assert_eq!(truncate_label("Bourg", 8), "Bourg");
        assert_eq!(truncate_label("Montbenon", 5), "Mont…");
    }
}
