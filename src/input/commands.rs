//! # Command Parsing
//!
//! Turns raw inbound lines into typed client messages.
//!
//! A session's first line is its hello (`{"character":"Aria"}`); every later line
//! is one intent tagged by `type`.

use crate::{ClientHello, ClientIntent, TacticaResult};

/// Parses a hello line.
///
/// Anything that is not a valid hello object counts as a hello without a
/// character selection, which admission then refuses.
///
/// # Examples
///
/// ```
/// use tactica::parse_hello;
///
/// assert_eq!(parse_hello(r#"{"character":"Aria"}"#).character.as_deref(), Some("Aria"));
/// assert_eq!(parse_hello("garbage").character, None);
/// ```
pub fn parse_hello(line: &str) -> ClientHello {
    serde_json::from_str(line.trim()).unwrap_or_default()
}

/// Parses an intent line.
pub fn parse_intent(line: &str) -> TacticaResult<ClientIntent> {
    Ok(serde_json::from_str(line.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TacticaError;

    #[test]
    fn test_hello_without_character() {
        assert_eq!(parse_hello("{}").character, None);
        assert_eq!(parse_hello(r#"{"character":null}"#).character, None);
    }

    #[test]
    fn test_intent_line_with_whitespace() {
        let intent = parse_intent("  {\"type\":\"skipTurn\"}\r\n").unwrap();
        assert_eq!(intent, ClientIntent::SkipTurn);
    }

    #[test]
    fn test_malformed_intent() {
        assert!(matches!(
            parse_intent(r#"{"type":"move","destX":"far"}"#),
            Err(TacticaError::Serde(_))
        ));
    }
}
