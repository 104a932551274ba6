use clap::ValueEnum;

use crate::api::LockResult;
use crate::error::Error;

/// How the `lock` command prints a successful acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// The service's response body, untouched.
    Json,
    /// Just the bare token, for shell capture.
    Token,
}

/// Renders the acquisition payload for the chosen mode. `json` never fails:
/// the body is passed through whether or not it parses. `token` requires a
/// body with a non-empty token.
pub fn render(result: &LockResult, mode: OutputMode) -> Result<String, Error> {
    match mode {
        OutputMode::Json => Ok(result.raw.clone()),
        OutputMode::Token => Ok(result.answer()?.token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_mode_prints_the_bare_token() {
        let result = LockResult {
            raw: r#"{"Token":"abc123","ExpiresAt":"2024-01-01T00:00:00Z"}"#.to_string(),
        };
        assert_eq!(render(&result, OutputMode::Token).unwrap(), "abc123");
    }

    #[test]
    fn json_mode_passes_the_body_through_even_when_unparseable() {
        let result = LockResult {
            raw: "definitely not json".to_string(),
        };
        assert_eq!(
            render(&result, OutputMode::Json).unwrap(),
            "definitely not json"
        );
    }

    #[test]
    fn empty_object_is_rejected_in_token_mode() {
        let result = LockResult {
            raw: "{}".to_string(),
        };
        let err = render(&result, OutputMode::Token).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse));
        assert_eq!(err.to_string(), "Could not lock mutex!");
    }

    #[test]
    fn invalid_json_is_rejected_in_token_mode() {
        let result = LockResult {
            raw: "{".to_string(),
        };
        assert!(matches!(
            render(&result, OutputMode::Token),
            Err(Error::MalformedResponse)
        ));
    }

    #[test]
    fn expiry_is_optional_in_token_mode() {
        let result = LockResult {
            raw: r#"{"Token":"abc123"}"#.to_string(),
        };
        assert_eq!(render(&result, OutputMode::Token).unwrap(), "abc123");
    }
}
