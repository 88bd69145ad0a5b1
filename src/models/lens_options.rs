//! Bifocal and colour lens option sets

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Selection of lens option tokens.
///
/// Accepted as a comma-separated string or a JSON array of strings. A string
/// selection is forwarded byte-for-byte; an array is joined with `","` once.
/// Token lookups ignore surrounding whitespace, blanks and repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LensOptions {
    tokens: Vec<String>,
    raw: Option<String>,
}

fn normalized<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options: Vec<String> = Vec::new();
    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() || options.iter().any(|o| o == token) {
            continue;
        }
        options.push(token.to_string());
    }
    options
}

impl LensOptions {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: normalized(tokens),
            raw: None,
        }
    }

    /// Parse a comma-separated selection such as `"KT, Progressive"`.
    /// The text itself is kept as the wire form.
    pub fn parse(text: &str) -> Self {
        Self {
            tokens: normalized(text.split(',')),
            raw: Some(text.to_string()),
        }
    }

    /// Parse the JSON shape accepted at the API boundary.
    ///
    /// `field` names the body key in the error message.
    pub fn from_value(field: &str, value: &Value) -> Result<Self, String> {
        match value {
            Value::String(text) => Ok(Self::parse(text)),
            Value::Array(items) => {
                let tokens = items
                    .iter()
                    .map(|item| {
                        item.as_str().ok_or_else(|| {
                            format!("{} must contain only strings, found {}", field, item)
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::from_tokens(tokens))
            }
            other => Err(format!(
                "{} must be a string or an array of strings, found {}",
                field, other
            )),
        }
    }

    pub fn contains(&self, option: &str) -> bool {
        self.tokens.iter().any(|o| o == option)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Wire encoding: the received text, or the tokens joined with `","`
    pub fn encode(&self) -> String {
        match &self.raw {
            Some(text) => text.clone(),
            None => self.tokens.join(","),
        }
    }
}

impl fmt::Display for LensOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for LensOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for LensOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value("lens options", &value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_and_array_forms_hold_same_tokens() {
        let from_text = LensOptions::from_value("bifocalOptions", &json!("KT, Progressive")).unwrap();
        let from_list =
            LensOptions::from_value("bifocalOptions", &json!(["KT", "Progressive"])).unwrap();

        assert!(from_text.iter().eq(from_list.iter()));
        assert_eq!(from_list.encode(), "KT,Progressive");
    }

    #[test]
    fn test_string_selection_forwarded_verbatim() {
        let options = LensOptions::parse("KT, Progressive, KT");
        assert_eq!(options.encode(), "KT, Progressive, KT");
        assert_eq!(options.len(), 2);

        let options = LensOptions::from_value("p_colour", &json!(" White ")).unwrap();
        assert_eq!(options.to_string(), " White ");
        assert!(options.contains("White"));
    }

    #[test]
    fn test_tokens_trimmed_and_deduplicated() {
        let options = LensOptions::parse(" White ,, Photochromic,White ,");
        assert_eq!(options.iter().collect::<Vec<_>>(), vec!["White", "Photochromic"]);
        assert!(options.contains("Photochromic"));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_array_selection_joined_once() {
        let options = LensOptions::from_tokens(["ARC", " Tint", "ARC"]);
        assert_eq!(options.encode(), "ARC,Tint");
    }

    #[test]
    fn test_empty_selection() {
        let options = LensOptions::parse("");
        assert!(options.is_empty());
        assert_eq!(options.encode(), "");
    }

    #[test]
    fn test_rejects_non_string_entries() {
        let err = LensOptions::from_value("p_colour", &json!(["Tint", 3])).unwrap_err();
        assert!(err.contains("p_colour"));

        assert!(LensOptions::from_value("p_colour", &json!(7)).is_err());
    }

    #[test]
    fn test_serde_uses_wire_string() {
        let options: LensOptions = serde_json::from_value(json!(["ARC", "Tint"])).unwrap();
        assert_eq!(serde_json::to_value(&options).unwrap(), json!("ARC,Tint"));

        let options: LensOptions = serde_json::from_value(json!("ARC , Tint")).unwrap();
        assert_eq!(serde_json::to_value(&options).unwrap(), json!("ARC , Tint"));
    }
}
