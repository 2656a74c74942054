//! Language tags and language identification.

mod script;

pub use script::ScriptIdentifier;

use std::fmt;
use std::str::FromStr;

/// Closed set of languages a question may be asked and answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lang {
    Arabic,
    English,
}

impl Lang {
    pub const ALL: [Lang; 2] = [Lang::Arabic, Lang::English];

    /// Short ISO 639-1 tag.
    pub fn tag(self) -> &'static str {
        match self {
            Lang::Arabic => "ar",
            Lang::English => "en",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported language tag: '{0}' (expected 'ar' or 'en')")]
pub struct UnknownLang(pub String);

impl FromStr for Lang {
    type Err = UnknownLang;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ar" | "arabic" => Ok(Lang::Arabic),
            "en" | "english" => Ok(Lang::English),
            other => Err(UnknownLang(other.to_string())),
        }
    }
}

/// Result of classifying a piece of text.
///
/// `lang` is `None` when the identifier has no usable guess at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub lang: Option<Lang>,
    pub confidence: f32,
}

impl Detection {
    pub fn confident(lang: Lang, confidence: f32) -> Self {
        Self {
            lang: Some(lang),
            confidence,
        }
    }

    pub fn uncertain() -> Self {
        Self {
            lang: None,
            confidence: 0.0,
        }
    }
}

/// Classifies text into a language tag.
/// Implemented by `ScriptIdentifier`; deterministic stubs are used in tests.
pub trait LanguageIdentifier {
    async fn identify(&self, text: &str) -> Detection;
}
