//! Journey model: a single trip with optional calendar date range.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Journey row. Timestamps are server-assigned; `start_date`/`end_date`
/// are plain calendar dates with no timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Journey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create-journey input. The date-range rule is enforced here, at creation
/// time only — stored rows are not re-validated.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = validate_date_range))]
pub struct CreateJourney {
    #[validate(length(min = 1, max = 140, message = "Title is required."))]
    pub title: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn validate_date_range(input: &CreateJourney) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(ValidationError::new("date_range")
                .with_message("End date cannot be before start date.".into()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateJourney {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, start: Option<&str>, end: Option<&str>) -> CreateJourney {
        let parse = |s: &str| s.parse::<NaiveDate>().unwrap();
        CreateJourney {
            title: title.to_string(),
            description: None,
            cover_image: None,
            start_date: start.map(parse),
            end_date: end.map(parse),
        }
    }

    #[test]
    fn title_is_required() {
        assert!(input("", None, None).validate().is_err());
        assert!(input("Tokyo Spring Trip", None, None).validate().is_ok());
    }

    #[test]
    fn end_date_must_not_precede_start_date() {
        assert!(input("Trip", Some("2026-05-10"), Some("2026-05-01"))
            .validate()
            .is_err());
        assert!(input("Trip", Some("2026-05-01"), Some("2026-05-10"))
            .validate()
            .is_ok());
        assert!(input("Trip", Some("2026-05-01"), Some("2026-05-01"))
            .validate()
            .is_ok());
    }

    #[test]
    fn open_ended_dates_are_valid() {
        assert!(input("Trip", None, Some("2026-05-10")).validate().is_ok());
        assert!(input("Trip", Some("2026-05-10"), None).validate().is_ok());
    }
}
