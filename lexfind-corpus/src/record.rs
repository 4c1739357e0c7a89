//! Profile record types and builder
//!
//! Core types for representing professional profiles in the corpus.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single education entry on a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_normalized: Option<String>,
    /// Marks the qualifying (law) degree, the one graduation-year queries
    /// compare against.
    #[serde(default)]
    pub is_law_degree: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
}

impl Education {
    /// Law degree entry (J.D. by default)
    pub fn law(school: impl Into<String>, year: i64) -> Self {
        Self {
            degree_type: Some("J.D.".to_string()),
            year: Some(year),
            school_name: Some(school.into()),
            is_law_degree: true,
            ..Default::default()
        }
    }

    /// Undergraduate degree entry
    pub fn undergrad(school: impl Into<String>, year: i64) -> Self {
        Self {
            degree_type: Some("B.A.".to_string()),
            year: Some(year),
            school_name: Some(school.into()),
            is_law_degree: false,
            ..Default::default()
        }
    }

    /// Set the normalized school name
    pub fn normalized(mut self, name: impl Into<String>) -> Self {
        self.school_normalized = Some(name.into());
        self
    }
}

/// A professional profile record.
///
/// The profile URL doubles as the record's external identity; everything else
/// is optional because source pages are incomplete more often than not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerkship: Option<String>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub practices: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl ProfileRecord {
    /// Create a builder for constructing records
    pub fn builder() -> ProfileRecordBuilder {
        ProfileRecordBuilder::new()
    }
}

/// Errors from building a profile record
#[derive(Debug, Error)]
pub enum RecordBuildError {
    #[error("profile url is required")]
    MissingUrl,
}

/// Builder for ProfileRecord with fluent API
#[derive(Debug, Default)]
pub struct ProfileRecordBuilder {
    record: ProfileRecord,
}

impl ProfileRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.record.url = url.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.record.name = Some(name.into());
        self
    }

    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.record.first_name = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.record.last_name = Some(last_name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.record.email = Some(email.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.record.phone = Some(phone.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.record.title = Some(title.into());
        self
    }

    pub fn office_location(mut self, location: impl Into<String>) -> Self {
        self.record.office_location = Some(location.into());
        self
    }

    pub fn clerkship(mut self, clerkship: impl Into<String>) -> Self {
        self.record.clerkship = Some(clerkship.into());
        self
    }

    pub fn education(mut self, education: Education) -> Self {
        self.record.educations.push(education);
        self
    }

    pub fn practice(mut self, practice: impl Into<String>) -> Self {
        self.record.practices.push(practice.into());
        self
    }

    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.record.industries.push(industry.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.record.regions.push(region.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.record.languages.push(language.into());
        self
    }

    /// Build the record, validating required fields
    pub fn build(self) -> Result<ProfileRecord, RecordBuildError> {
        if self.record.url.is_empty() {
            return Err(RecordBuildError::MissingUrl);
        }
        Ok(self.record)
    }
}
