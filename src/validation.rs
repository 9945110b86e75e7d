use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{Result, WalletCareError};
use crate::models::{ExamForm, ExamResultForm, ProfileForm};

#[allow(clippy::expect_used)]
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));
#[allow(clippy::expect_used)]
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));
// Brazilian display format: (11) 98765-4321 or (11) 3456-7890
#[allow(clippy::expect_used)]
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d{2}\) \d{4,5}-\d{4}$").expect("valid phone pattern"));

const MAX_TEXT_LEN: usize = 200;
const MAX_AGE: u32 = 150;

/// Checks applied to forms before they reach storage
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate an exam form before insert or update
    pub fn validate_exam_form(form: &ExamForm) -> Result<()> {
        Self::validate_exam_name(&form.name)?;
        Self::validate_optional_text("Doctor", form.doctor.as_deref())?;
        Self::validate_optional_text("Clinic", form.clinic.as_deref())?;
        Ok(())
    }

    /// Validate exam name
    pub fn validate_exam_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(invalid("Exam name cannot be empty"));
        }

        if name.chars().count() > MAX_TEXT_LEN {
            return Err(invalid(format!("Exam name too long (max {MAX_TEXT_LEN} characters)")));
        }

        if name.contains(['\0', '\r', '\n']) {
            return Err(invalid("Exam name contains invalid characters"));
        }

        Ok(())
    }

    /// Parse a `YYYY-MM-DD` exam date, rejecting impossible calendar dates
    pub fn parse_exam_date(text: &str) -> Result<NaiveDate> {
        let text = text.trim();
        if !DATE_PATTERN.is_match(text) {
            return Err(invalid(format!("Date must use the YYYY-MM-DD format: {text:?}")));
        }

        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|_| invalid(format!("Not a calendar date: {text}")))
    }

    /// Validate a profile form before it is saved
    pub fn validate_profile_form(form: &ProfileForm) -> Result<()> {
        Self::validate_optional_text("Name", form.name.as_deref())?;

        if let Some(email) = form.email.as_deref().filter(|e| !e.trim().is_empty()) {
            Self::validate_email(email)?;
        }
        if let Some(phone) = form.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            Self::validate_phone(phone)?;
        }
        if let Some(age) = form.age {
            Self::validate_age(age)?;
        }

        Ok(())
    }

    /// Validate a lab value before it is added
    pub fn validate_result_form(form: &ExamResultForm) -> Result<()> {
        if form.parameter_name.trim().is_empty() {
            return Err(invalid("Parameter name cannot be empty"));
        }
        Self::validate_optional_text("Parameter name", Some(&form.parameter_name))
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<()> {
        if email.len() > 254 {
            return Err(invalid("Email too long (max 254 characters)"));
        }

        if !EMAIL_PATTERN.is_match(email) {
            return Err(invalid(format!("Invalid email: {email}")));
        }

        Ok(())
    }

    /// Validate phone format, e.g. `(11) 98765-4321`
    pub fn validate_phone(phone: &str) -> Result<()> {
        if !PHONE_PATTERN.is_match(phone) {
            return Err(invalid(format!(
                "Phone must look like (11) 98765-4321: {phone}"
            )));
        }

        Ok(())
    }

    /// Validate age in years
    pub fn validate_age(age: u32) -> Result<()> {
        if age > MAX_AGE {
            return Err(invalid(format!("Age must be at most {MAX_AGE}")));
        }
        Ok(())
    }

    /// Format raw phone input as `(dd) dddd-dddd` or `(dd) ddddd-dddd`
    ///
    /// Only digits are kept. Ten digits use the landline layout; eleven or
    /// more format the first eleven as a mobile number and append the rest
    /// unchanged. Fewer than ten come back as the bare digits.
    #[must_use]
    pub fn format_phone(raw: &str) -> String {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        match digits.len() {
            0..=9 => digits,
            10 => format!("({}) {}-{}", &digits[..2], &digits[2..6], &digits[6..]),
            _ => format!(
                "({}) {}-{}{}",
                &digits[..2],
                &digits[2..7],
                &digits[7..11],
                &digits[11..]
            ),
        }
    }

    fn validate_optional_text(field: &str, value: Option<&str>) -> Result<()> {
        if value.is_some_and(|v| v.chars().count() > MAX_TEXT_LEN) {
            return Err(invalid(format!("{field} too long (max {MAX_TEXT_LEN} characters)")));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> WalletCareError {
    WalletCareError::Validation(message.into())
}
