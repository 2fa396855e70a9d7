//! Spoken-language and salutation preferences.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Announcement language. Only two locales are voiced; anything else
/// falls back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    /// Parse a language code, falling back to English for unknown codes
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "hi" | "hindi" => Language::Hindi,
            _ => Language::English,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// Serialized as the bare code so stored files read "en"/"hi"
impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Language::from_code(&code))
    }
}

/// How the chat greeting addresses the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "female" | "f" => Gender::Female,
            _ => Gender::Male,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_fallback() {
        assert_eq!(Language::from_code("hi"), Language::Hindi);
        assert_eq!(Language::from_code("EN"), Language::English);
        assert_eq!(Language::from_code("fr"), Language::English);
        assert_eq!(Language::from_code(""), Language::English);
    }

    #[test]
    fn test_language_serde_uses_codes() {
        let json = serde_json::to_string(&Language::Hindi).unwrap();
        assert_eq!(json, "\"hi\"");

        let parsed: Language = serde_json::from_str("\"de\"").unwrap();
        assert_eq!(parsed, Language::English);
    }

    #[test]
    fn test_gender_label() {
        assert_eq!(Gender::from_label("Female"), Gender::Female);
        assert_eq!(Gender::from_label("anything"), Gender::Male);
    }
}
