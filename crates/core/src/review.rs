//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ReviewId;
use crate::validation::ValidationErrors;

pub const MIN_COMMENT_CHARS: usize = 10;
pub const MAX_COMMENT_CHARS: usize = 1000;
pub const MAX_TITLE_CHARS: usize = 120;

/// A published review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub rating: u8,
    #[serde(default)]
    pub title: Option<String>,
    pub comment: String,
    #[serde(default, alias = "customerName")]
    pub customer_name: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Raw review form fields as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
}

/// A validated review, ready to send to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub comment: String,
}

impl ReviewForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every failing field: rating outside 1..=5, comment outside
    /// 10..=1000 characters after trimming, title over 120 characters.
    pub fn validate(&self) -> Result<NewReview, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let rating = match self.rating.trim().parse::<u8>() {
            Ok(r) if (1..=5).contains(&r) => r,
            _ => {
                errors.add("rating", "Choose a rating from 1 to 5 stars.");
                0
            }
        };

        let comment = self.comment.trim();
        let comment_len = comment.chars().count();
        if comment_len < MIN_COMMENT_CHARS {
            errors.add(
                "comment",
                format!("Please write at least {MIN_COMMENT_CHARS} characters."),
            );
        } else if comment_len > MAX_COMMENT_CHARS {
            errors.add(
                "comment",
                format!("Reviews are limited to {MAX_COMMENT_CHARS} characters."),
            );
        }

        let title = self.title.trim();
        if title.chars().count() > MAX_TITLE_CHARS {
            errors.add(
                "title",
                format!("Titles are limited to {MAX_TITLE_CHARS} characters."),
            );
        }

        errors.into_result(NewReview {
            rating,
            title: (!title.is_empty()).then(|| title.to_owned()),
            comment: comment.to_owned(),
        })
    }
}

/// Star breakdown shown above the review list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingSummary {
    pub count: u32,
    pub average: Option<f32>,
    /// Counts for 1 through 5 stars.
    pub histogram: [u32; 5],
}

impl RatingSummary {
    #[must_use]
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let mut histogram = [0_u32; 5];
        let mut total = 0_u32;
        let mut count = 0_u32;
        for review in reviews {
            if let Some(slot) = histogram.get_mut(usize::from(review.rating.clamp(1, 5) - 1)) {
                *slot += 1;
            }
            total += u32::from(review.rating.clamp(1, 5));
            count += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let average = (count > 0).then(|| total as f32 / count as f32);
        Self {
            count,
            average,
            histogram,
        }
    }

    /// Share of reviews with `stars` stars, 0..=100.
    #[must_use]
    pub fn percent(&self, stars: u8) -> u32 {
        if self.count == 0 || !(1..=5).contains(&stars) {
            return 0;
        }
        self.histogram
            .get(usize::from(stars - 1))
            .map_or(0, |n| n * 100 / self.count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(rating: &str, title: &str, comment: &str) -> ReviewForm {
        ReviewForm {
            rating: rating.into(),
            title: title.into(),
            comment: comment.into(),
        }
    }

    fn review(rating: u8) -> Review {
        Review {
            id: ReviewId::new(1),
            rating,
            title: None,
            comment: "Lovely fabric, fits well".into(),
            customer_name: None,
            created_at: None,
        }
    }

    #[test]
    fn test_valid_review() {
        let review = form("5", "  Great  ", "  Fits perfectly, will buy again  ")
            .validate()
            .unwrap();
        assert_eq!(review.rating, 5);
        assert_eq!(review.title.as_deref(), Some("Great"));
        assert_eq!(review.comment, "Fits perfectly, will buy again");
    }

    #[test]
    fn test_blank_title_is_none() {
        let review = form("3", "   ", "Decent for the price").validate().unwrap();
        assert_eq!(review.title, None);
    }

    #[test]
    fn test_collects_every_error() {
        let errors = form("0", &"t".repeat(121), "short").validate().unwrap_err();
        assert!(errors.has("rating"));
        assert!(errors.has("title"));
        assert!(errors.has("comment"));
    }

    #[test]
    fn test_comment_bounds_count_chars() {
        assert!(form("4", "", "áéíóúáéíóú").validate().is_ok());
        let errors = form("4", "", &"x".repeat(1001)).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(form("4", "", &"x".repeat(1000)).validate().is_ok());
    }

    #[test]
    fn test_non_numeric_rating() {
        let errors = form("five", "", "Really comfortable").validate().unwrap_err();
        assert!(errors.has("rating"));
    }

    #[test]
    fn test_rating_summary() {
        let reviews = vec![review(5), review(5), review(4), review(1)];
        let summary = RatingSummary::from_reviews(&reviews);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.histogram, [1, 0, 0, 1, 2]);
        assert!((summary.average.unwrap() - 3.75).abs() < f32::EPSILON);
        assert_eq!(summary.percent(5), 50);
        assert_eq!(summary.percent(0), 0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = RatingSummary::from_reviews(&[]);
        assert_eq!(summary.average, None);
        assert_eq!(summary.percent(3), 0);
    }
}
