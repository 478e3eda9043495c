//! Vocabulary and per-language word pools.
//!
//! The two word lists are index-aligned: `ENGLISH_WORDS[i]` translates to
//! `SPANISH_WORDS[i]`. A [`WordPool`] samples one list without replacement and
//! refills itself once every word has been shown.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Deserialize, Serialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
        }
    }

    pub fn vocabulary(self) -> &'static [&'static str] {
        match self {
            Self::English => ENGLISH_WORDS,
            Self::Spanish => SPANISH_WORDS,
        }
    }

    fn other(self) -> Self {
        match self {
            Self::English => Self::Spanish,
            Self::Spanish => Self::English,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub const ENGLISH_WORDS: &[&str] = &[
    "cheese", "dog", "car", "book", "phone", "tree", "water", "music", "house", "coffee",
    "beach", "movie", "friend", "school", "birthday", "vacation", "candle", "garden",
    "summer", "winter", "football", "computer", "restaurant", "doctor", "river",
    "heart", "song", "butterfly", "volcano", "elephant", "rainbow", "mountain",
    "lighthouse", "telescope", "dinosaur", "island", "kitchen", "window", "bread", "moon",
];

pub const SPANISH_WORDS: &[&str] = &[
    "queso", "perro", "coche", "libro", "teléfono", "árbol", "agua", "música", "casa", "café",
    "playa", "película", "amigo", "escuela", "cumpleaños", "vacaciones", "vela", "jardín",
    "verano", "invierno", "fútbol", "ordenador", "restaurante", "médico", "río",
    "corazón", "canción", "mariposa", "volcán", "elefante", "arcoíris", "montaña",
    "faro", "telescopio", "dinosaurio", "isla", "cocina", "ventana", "pan", "luna",
];

/// Looks up the counterpart of `word` in the other language's list.
pub fn translate(word: &str, language: Language) -> Option<&'static str> {
    let idx = language.vocabulary().iter().position(|w| *w == word)?;
    language.other().vocabulary().get(idx).copied()
}

/// Draw-without-replacement sampler over one language's vocabulary.
#[derive(Clone, Debug)]
pub struct WordPool {
    vocabulary: &'static [&'static str],
    available: Vec<&'static str>,
    used: Vec<&'static str>,
}

impl WordPool {
    pub fn new(vocabulary: &'static [&'static str]) -> Self {
        Self {
            vocabulary,
            available: vocabulary.to_vec(),
            used: Vec::new(),
        }
    }

    pub fn available(&self) -> &[&'static str] {
        &self.available
    }

    pub fn used(&self) -> &[&'static str] {
        &self.used
    }

    /// Picks a word uniformly at random from the words not yet shown this cycle.
    pub fn draw_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &'static str {
        if self.available.is_empty() {
            self.refill();
        }
        let idx = rng.random_range(0..self.available.len());
        let word = self.available.swap_remove(idx);
        self.used.push(word);
        word
    }

    pub fn draw(&mut self) -> &'static str {
        self.draw_with(&mut rand::rng())
    }

    fn refill(&mut self) {
        tracing::debug!(words = self.vocabulary.len(), "Word pool exhausted, refilling");
        self.available = self.vocabulary.to_vec();
        self.used.clear();
    }
}

/// One pool per language, owned by a room for its whole lifetime.
#[derive(Clone, Debug)]
pub struct WordPools {
    english: WordPool,
    spanish: WordPool,
}

impl Default for WordPools {
    fn default() -> Self {
        Self::new()
    }
}

impl WordPools {
    pub fn new() -> Self {
        Self {
            english: WordPool::new(ENGLISH_WORDS),
            spanish: WordPool::new(SPANISH_WORDS),
        }
    }

    pub fn pool(&self, language: Language) -> &WordPool {
        match language {
            Language::English => &self.english,
            Language::Spanish => &self.spanish,
        }
    }

    pub fn draw(&mut self, language: Language) -> &'static str {
        match language {
            Language::English => self.english.draw(),
            Language::Spanish => self.spanish.draw(),
        }
    }
}
