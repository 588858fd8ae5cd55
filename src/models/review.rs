//! Review document stored in the reviews tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub comment: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
    pub author: String,
}

impl Review {
    pub fn new(input: ReviewInput, author: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            comment: input.comment,
            // In 1..=5 once validated
            rating: input.rating.unwrap_or_default() as u8,
            created_at: Utc::now(),
            author: author.to_string(),
        }
    }
}

/// Submitted review fields
///
/// Fields are lenient so that missing or out-of-range values are reported by
/// [`ReviewInput::validate`] rather than by the decoder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl ReviewInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.comment.trim().is_empty() {
            return Err(ValidationError::new("\"comment\" is required"));
        }
        let Some(rating) = self.rating else {
            return Err(ValidationError::new("\"rating\" is required"));
        };
        if rating.fract() != 0.0 || !(1.0..=5.0).contains(&rating) {
            return Err(ValidationError::new(
                "\"rating\" must be a whole number between 1 and 5",
            ));
        }
        Ok(())
    }
}
