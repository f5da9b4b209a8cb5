//! OCR confusable handling.
//!
//! Recognition engines routinely swap letters and digits that share a glyph
//! shape. Digit contexts (quantities, prices, timestamps) are repaired towards
//! digits; item names are compared after mapping digits back to letters.

/// Letter-like glyphs that stand in for a digit.
const DIGIT_CONFUSABLES: &[(char, char)] = &[
    ('O', '0'),
    ('o', '0'),
    ('D', '0'),
    ('Q', '0'),
    ('l', '1'),
    ('I', '1'),
    ('i', '1'),
    ('|', '1'),
    ('!', '1'),
    ('S', '5'),
    ('s', '5'),
    ('Z', '2'),
    ('z', '2'),
    ('B', '8'),
    ('G', '6'),
];

/// Digits that stand in for a letter inside words.
const LETTER_CONFUSABLES: &[(char, char)] = &[
    ('0', 'o'),
    ('1', 'l'),
    ('5', 's'),
    ('2', 'z'),
    ('8', 'b'),
    ('6', 'g'),
    ('|', 'l'),
];

/// Grouping noise that OCR leaves inside numbers.
const NUMBER_SEPARATORS: &[char] = &[',', '.', ' ', '\'', '_', '`'];

pub fn confusable_digit(c: char) -> Option<char> {
    if c.is_ascii_digit() {
        return Some(c);
    }
    DIGIT_CONFUSABLES
        .iter()
        .find(|(glyph, _)| *glyph == c)
        .map(|(_, digit)| *digit)
}

fn confusable_letter(c: char) -> char {
    LETTER_CONFUSABLES
        .iter()
        .find(|(glyph, _)| *glyph == c)
        .map(|(_, letter)| *letter)
        .unwrap_or(c)
}

/// Parse a numeric string carrying OCR noise into an integer.
///
/// Confusable glyphs map to their digit and grouping separators are dropped.
/// At least one real digit must be present so plain words never parse.
pub fn normalize_number(raw: &str) -> Option<u64> {
    let mut digits = String::with_capacity(raw.len());
    let mut real_digits = 0usize;

    for c in raw.trim().chars() {
        if NUMBER_SEPARATORS.contains(&c) {
            continue;
        }
        let digit = confusable_digit(c)?;
        if c.is_ascii_digit() {
            real_digits += 1;
        }
        digits.push(digit);
    }

    if real_digits == 0 || digits.is_empty() || digits.len() > 19 {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Repair confusables inside whitespace-delimited tokens that are numeric in
/// shape (`x2OO`, `5B5,585,OOO`), leaving ordinary words untouched.
pub fn repair_numeric_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();

    for c in text.chars() {
        if c.is_whitespace() {
            flush_word(&mut out, &mut word);
            out.push(c);
        } else {
            word.push(c);
        }
    }
    flush_word(&mut out, &mut word);
    out
}

fn flush_word(out: &mut String, word: &mut String) {
    if word.is_empty() {
        return;
    }
    match repair_word(word) {
        Some(repaired) => out.push_str(&repaired),
        None => out.push_str(word),
    }
    word.clear();
}

fn repair_word(word: &str) -> Option<String> {
    let (prefix, body) = match word.chars().next() {
        Some(first @ ('x' | 'X' | '×')) if word.chars().count() > 1 => {
            (Some(first), &word[first.len_utf8()..])
        }
        _ => (None, word),
    };

    let mut repaired = String::with_capacity(word.len());
    let mut real_digits = 0usize;
    let mut confusables = 0usize;
    for c in body.chars() {
        if c.is_ascii_digit() {
            real_digits += 1;
            repaired.push(c);
        } else if matches!(c, ',' | '.' | ':' | '\'' | '-') {
            repaired.push(c);
        } else {
            repaired.push(confusable_digit(c)?);
            confusables += 1;
        }
    }

    // A lone digit among mostly letters is a word, not a number.
    if real_digits == 0 || confusables > real_digits.max(1) * 2 {
        return None;
    }

    Some(match prefix {
        Some(_) => format!("x{repaired}"),
        None => repaired,
    })
}

/// Lowercased, digit-to-letter mapped, alphanumeric-only form used to compare
/// item names.
pub fn letter_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut last_space = true;
    for c in name.chars() {
        let c = confusable_letter(c).to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            key.push(c);
            last_space = false;
        } else if !last_space {
            key.push(' ');
            last_space = true;
        }
    }
    key.trim_end().to_string()
}

/// Whitespace-collapsed, lowercased text for loose "same text" comparisons.
pub fn canonical_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noisy_number_matches_clean_equivalent() {
        let clean = normalize_number("585,585,000");
        assert_eq!(clean, Some(585_585_000));
        assert_eq!(normalize_number("5B5,5 85,OOO"), clean);
        assert_eq!(normalize_number("58S.585.0O0"), clean);
        assert_eq!(normalize_number("585,,585 ,000"), clean);
    }

    #[test]
    fn words_do_not_parse_as_numbers() {
        assert_eq!(normalize_number("Silver"), None);
        assert_eq!(normalize_number("lol"), None);
        assert_eq!(normalize_number(""), None);
    }

    #[test]
    fn repairs_numeric_tokens_only() {
        let repaired = repair_numeric_tokens("Magical Shard x2OO worth 5B5,585,OOO Silver");
        assert_eq!(repaired, "Magical Shard x200 worth 585,585,000 Silver");
    }

    #[test]
    fn letter_key_undoes_digit_substitution() {
        assert_eq!(letter_key("Magica1 Shard"), "magical shard");
        assert_eq!(letter_key("  Black  St0ne (Armor) "), "black stone armor");
    }

    #[test]
    fn canonical_text_collapses_whitespace() {
        assert_eq!(canonical_text("Listed  Shard\n x5"), "listed shard x5");
    }
}
