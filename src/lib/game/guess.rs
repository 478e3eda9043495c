use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Canonical form used to compare a guess with the secret word: trimmed,
/// lower-cased, inner whitespace collapsed to one space, accents removed.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(fold_word)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn matches(guess: &str, secret: &str) -> bool {
    normalize(guess) == normalize(secret)
}

// Decomposes so precomposed and combining-mark spellings fold alike.
fn fold_word(word: &str) -> String {
    word.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
