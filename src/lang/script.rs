use std::cmp::Ordering;

use super::{Detection, Lang, LanguageIdentifier};

/// Identifies Arabic vs. English by counting letters per script.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptIdentifier;

impl ScriptIdentifier {
    pub fn classify(text: &str) -> Detection {
        let (arabic, latin) = count_letters(text);
        let total = arabic + latin;
        if total == 0 {
            return Detection::uncertain();
        }

        let (lang, winning) = match arabic.cmp(&latin) {
            Ordering::Greater => (Lang::Arabic, arabic),
            Ordering::Less => (Lang::English, latin),
            Ordering::Equal => return Detection::uncertain(),
        };
        Detection::confident(lang, winning as f32 / total as f32)
    }
}

impl LanguageIdentifier for ScriptIdentifier {
    async fn identify(&self, text: &str) -> Detection {
        Self::classify(text)
    }
}

fn count_letters(text: &str) -> (usize, usize) {
    text.chars()
        .filter(|c| c.is_alphabetic())
        .fold((0, 0), |(arabic, latin), c| {
            if is_arabic(c) {
                (arabic + 1, latin)
            } else if c.is_ascii_alphabetic() || matches!(c, '\u{00C0}'..='\u{024F}') {
                (arabic, latin + 1)
            } else {
                (arabic, latin)
            }
        })
}

fn is_arabic(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}' |
        '\u{0750}'..='\u{077F}' |
        '\u{08A0}'..='\u{08FF}' |
        '\u{FB50}'..='\u{FDFF}' |
        '\u{FE70}'..='\u{FEFF}'
    )
}
