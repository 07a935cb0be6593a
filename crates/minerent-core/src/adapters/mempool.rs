use serde::Deserialize;

use super::{ensure_positive, parse_json};
use crate::data_source::{SourceError, SourceId, Upstream};
use crate::domain::{Difficulty, FALLBACK_DIFFICULTY};
use crate::http_client::HttpRequest;

const DIFFICULTY_URL: &str = "https://mempool.space/api/v1/mining/hashrate/difficulty";

/// Current difficulty and next-retarget change from mempool.space.
///
/// Either field may be absent from a valid response; a missing difficulty
/// reads as the fallback constant and a missing change as `0.0`.
#[derive(Debug, Clone)]
pub struct MempoolAdapter {
    url: String,
}

impl Default for MempoolAdapter {
    fn default() -> Self {
        Self::with_url(DIFFICULTY_URL)
    }
}

impl MempoolAdapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Upstream for MempoolAdapter {
    type Output = Difficulty;

    fn id(&self) -> SourceId {
        SourceId::Mempool
    }

    fn request(&self) -> HttpRequest {
        HttpRequest::get(&self.url).with_header("Accept", "application/json")
    }

    fn parse(&self, body: &str) -> Result<Difficulty, SourceError> {
        let response: MempoolDifficulty = parse_json(self.id(), body)?;
        let difficulty = ensure_positive(
            self.id(),
            "currentDifficulty",
            response.current_difficulty.unwrap_or(FALLBACK_DIFFICULTY),
        )?;
        let adjustment = response.difficulty_change.unwrap_or(0.0);
        if !adjustment.is_finite() {
            return Err(SourceError::parse(
                self.id().as_str(),
                "field 'difficultyChange' must be finite",
            ));
        }

        Ok(Difficulty {
            difficulty,
            adjustment,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MempoolDifficulty {
    #[serde(rename = "currentDifficulty")]
    current_difficulty: Option<f64>,
    #[serde(rename = "difficultyChange")]
    difficulty_change: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_difficulty_and_change() {
        let body = r#"{"currentDifficulty":60000000000000.0,"difficultyChange":1.2}"#;
        let difficulty = MempoolAdapter::default().parse(body).expect("valid");

        assert_eq!(difficulty.difficulty, 60e12);
        assert_eq!(difficulty.adjustment, 1.2);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let difficulty = MempoolAdapter::default().parse("{}").expect("valid");
        assert_eq!(difficulty, Difficulty::FALLBACK);
    }

    #[test]
    fn rejects_malformed_body() {
        assert!(MempoolAdapter::default().parse("<html>502 Bad Gateway</html>").is_err());
    }
}
