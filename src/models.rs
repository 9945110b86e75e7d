//! Data models for health records
//!
//! Stored records (`Exam`, `ExamResult`, `UserProfile`) are what the storage
//! engine reads back. Forms (`ExamForm`, `ExamResultForm`, `ProfileForm`) are
//! what callers hand in for inserts and full-record updates.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Kind of exam. Storage accepts free text; unknown values are kept in `Other`.
///
/// Equality follows the stored text, so `Other("imagem")` equals `Imagem`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExamType {
    /// Laboratory exam (`laboratorial`)
    #[default]
    Laboratorial,
    /// Imaging exam (`imagem`)
    Imagem,
    /// Any other exam (`outros`)
    Outros,
    /// Value written by something other than this crate
    Other(String),
}

impl ExamType {
    /// Value stored in the `type` column
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Laboratorial => "laboratorial",
            Self::Imagem => "imagem",
            Self::Outros => "outros",
            Self::Other(value) => value,
        }
    }

    /// Human-readable label shown by the app
    #[must_use]
    pub fn label(&self) -> &str {
        match self.as_str() {
            "laboratorial" => "Exame Laboratorial",
            "imagem" => "Exame de Imagem",
            "outros" => "Outros Exames",
            other => other,
        }
    }
}

impl PartialEq for ExamType {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ExamType {}

impl Hash for ExamType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for ExamType {
    fn from(value: &str) -> Self {
        match value {
            "laboratorial" => Self::Laboratorial,
            "imagem" => Self::Imagem,
            "outros" => Self::Outros,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ExamType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ExamType> for String {
    fn from(value: ExamType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single lab value; equality follows the stored text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    /// Within the reference range
    #[default]
    Normal,
    /// Below the reference range
    Low,
    /// Above the reference range
    High,
    /// Needs immediate attention
    Critical,
    /// Free-text status
    Other(String),
}

impl ResultStatus {
    /// Value stored in the `status` column
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal => "normal",
            Self::Low => "low",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Other(value) => value,
        }
    }
}

impl PartialEq for ResultStatus {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ResultStatus {}

impl From<&str> for ResultStatus {
    fn from(value: &str) -> Self {
        match value {
            "normal" => Self::Normal,
            "low" => Self::Low,
            "high" => Self::High,
            "critical" => Self::Critical,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ResultStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ResultStatus> for String {
    fn from(value: ResultStatus) -> Self {
        value.as_str().to_string()
    }
}

/// A stored medical exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    /// Engine-assigned identifier, never reused
    pub id: i64,
    /// Exam name
    pub name: String,
    /// Requesting doctor
    pub doctor: Option<String>,
    /// Date the exam was taken
    pub date: NaiveDate,
    /// Clinic or lab
    pub clinic: Option<String>,
    /// Kind of exam
    pub exam_type: ExamType,
    /// Base64 document image
    pub image_data: Option<String>,
    /// Set once at insert
    pub created_at: NaiveDateTime,
    /// Refreshed on every update
    pub updated_at: NaiveDateTime,
}

impl Exam {
    /// Whether a document image is stored with this exam
    #[must_use]
    pub const fn has_image(&self) -> bool {
        self.image_data.is_some()
    }

    /// The editable fields of this exam, ready to be changed and passed to an update
    #[must_use]
    pub fn to_form(&self) -> ExamForm {
        ExamForm {
            name: self.name.clone(),
            doctor: self.doctor.clone(),
            date: self.date,
            clinic: self.clinic.clone(),
            exam_type: Some(self.exam_type.clone()),
            image_data: self.image_data.clone(),
        }
    }
}

/// Fields supplied when creating or fully replacing an exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamForm {
    /// Exam name, must not be blank
    pub name: String,
    /// Requesting doctor
    pub doctor: Option<String>,
    /// Date the exam was taken
    pub date: NaiveDate,
    /// Clinic or lab
    pub clinic: Option<String>,
    /// Kind of exam; `laboratorial` when absent
    pub exam_type: Option<ExamType>,
    /// Base64 document image
    pub image_data: Option<String>,
}

impl ExamForm {
    /// A form with only the required fields set
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            doctor: None,
            date,
            clinic: None,
            exam_type: None,
            image_data: None,
        }
    }

    /// Set the doctor
    #[must_use]
    pub fn with_doctor(mut self, doctor: impl Into<String>) -> Self {
        self.doctor = Some(doctor.into());
        self
    }

    /// Set the clinic
    #[must_use]
    pub fn with_clinic(mut self, clinic: impl Into<String>) -> Self {
        self.clinic = Some(clinic.into());
        self
    }

    /// Set the exam type
    #[must_use]
    pub fn with_type(mut self, exam_type: ExamType) -> Self {
        self.exam_type = Some(exam_type);
        self
    }

    /// Attach an encoded image
    #[must_use]
    pub fn with_image(mut self, image_data: impl Into<String>) -> Self {
        self.image_data = Some(image_data.into());
        self
    }

    /// Trim text fields and turn blank optional ones into `None`
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            doctor: blank_to_none(self.doctor),
            date: self.date,
            clinic: blank_to_none(self.clinic),
            exam_type: self.exam_type,
            image_data: blank_to_none(self.image_data),
        }
    }
}

/// A structured lab value belonging to an exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    /// Engine-assigned identifier
    pub id: i64,
    /// Owning exam
    pub exam_id: i64,
    /// Measured parameter (e.g. "Hemoglobina")
    pub parameter_name: String,
    /// Measured value
    pub value: Option<String>,
    /// Reference range as printed on the report
    pub reference_range: Option<String>,
    /// Unit of the value
    pub unit: Option<String>,
    /// Status of the value
    pub status: ResultStatus,
}

/// Fields supplied when adding a lab value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResultForm {
    /// Measured parameter, must not be blank
    pub parameter_name: String,
    /// Measured value
    pub value: Option<String>,
    /// Reference range
    pub reference_range: Option<String>,
    /// Unit
    pub unit: Option<String>,
    /// Status; `normal` when absent
    pub status: Option<ResultStatus>,
}

impl ExamResultForm {
    /// Trim text fields and turn blank optional ones into `None`
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            parameter_name: self.parameter_name.trim().to_string(),
            value: blank_to_none(self.value),
            reference_range: blank_to_none(self.reference_range),
            unit: blank_to_none(self.unit),
            status: self.status,
        }
    }
}

/// The single local user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Row identifier; stable across updates
    pub id: i64,
    /// Display name
    pub name: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Age in years
    pub age: Option<u32>,
    /// Phone number
    pub phone: Option<String>,
    /// Base64 profile picture
    pub profile_image: Option<String>,
    /// Set at the first write
    pub created_at: NaiveDateTime,
    /// Refreshed on every write
    pub updated_at: NaiveDateTime,
}

/// Fields supplied when saving the profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    /// Display name
    pub name: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Age in years
    pub age: Option<u32>,
    /// Phone number
    pub phone: Option<String>,
    /// Base64 profile picture
    pub profile_image: Option<String>,
}

impl ProfileForm {
    /// Trim text fields and turn blank ones into `None`
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_none(self.name),
            email: blank_to_none(self.email),
            age: self.age,
            phone: blank_to_none(self.phone),
            profile_image: blank_to_none(self.profile_image),
        }
    }
}

/// Narrowing applied to the exam list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamFilter {
    /// Only exams of this type
    pub exam_type: Option<ExamType>,
    /// Case-insensitive text looked up in name, doctor and clinic
    pub text: Option<String>,
}

impl ExamFilter {
    /// Only exams of the given type
    #[must_use]
    pub const fn by_type(exam_type: ExamType) -> Self {
        Self {
            exam_type: Some(exam_type),
            text: None,
        }
    }

    /// Only exams mentioning the given text
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            exam_type: None,
            text: Some(text.into()),
        }
    }

    /// Whether the text part of the filter accepts the exam
    #[must_use]
    pub fn matches_text(&self, exam: &Exam) -> bool {
        let Some(needle) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();

        std::iter::once(Some(exam.name.as_str()))
            .chain([exam.doctor.as_deref(), exam.clinic.as_deref()])
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Number of exams per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamCounts {
    /// All exams
    pub total: u64,
    /// `laboratorial` exams
    pub laboratorial: u64,
    /// `imagem` exams
    pub imagem: u64,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam(name: &str, doctor: Option<&str>, clinic: Option<&str>) -> Exam {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        Exam {
            id: 1,
            name: name.to_string(),
            doctor: doctor.map(ToString::to_string),
            date: at.date(),
            clinic: clinic.map(ToString::to_string),
            exam_type: ExamType::Laboratorial,
            image_data: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn exam_type_round_trips_through_text() {
        for value in ["laboratorial", "imagem", "outros", "ultrassom"] {
            assert_eq!(ExamType::from(value).as_str(), value);
        }
        assert_eq!(ExamType::default(), ExamType::Laboratorial);
        assert_eq!(ExamType::from("ultrassom"), ExamType::Other("ultrassom".to_string()));
    }

    #[test]
    fn free_text_known_type_equals_its_variant() {
        use std::collections::HashSet;

        let spelled = ExamType::Other("imagem".to_string());
        assert_eq!(spelled, ExamType::Imagem);
        assert_ne!(spelled, ExamType::Laboratorial);
        assert_eq!(spelled.label(), "Exame de Imagem");

        let types: HashSet<ExamType> = [spelled, ExamType::Imagem].into_iter().collect();
        assert_eq!(types.len(), 1);

        assert_eq!(ResultStatus::Other("high".to_string()), ResultStatus::High);
    }

    #[test]
    fn result_status_defaults_to_normal() {
        assert_eq!(ResultStatus::default().as_str(), "normal");
        assert_eq!(ResultStatus::from("high"), ResultStatus::High);
    }

    #[test]
    fn normalized_form_drops_blank_optionals() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let form = ExamForm::new("  Hemograma ", date)
            .with_doctor("   ")
            .with_clinic(" Clínica X ")
            .normalized();

        assert_eq!(form.name, "Hemograma");
        assert_eq!(form.doctor, None);
        assert_eq!(form.clinic.as_deref(), Some("Clínica X"));
    }

    #[test]
    fn text_filter_is_case_insensitive_over_three_fields() {
        let e = exam("Hemograma", Some("Dra. Ana"), Some("CLÍNICA Vida"));

        assert!(ExamFilter::search("hemo").matches_text(&e));
        assert!(ExamFilter::search("ana").matches_text(&e));
        assert!(ExamFilter::search("clínica").matches_text(&e));
        assert!(!ExamFilter::search("raio").matches_text(&e));
        assert!(ExamFilter::search("   ").matches_text(&e));
    }

    #[test]
    fn to_form_keeps_every_editable_field() {
        let e = exam("Raio X", Some("Dr. Leo"), None);
        let form = e.to_form();

        assert_eq!(form.name, "Raio X");
        assert_eq!(form.doctor.as_deref(), Some("Dr. Leo"));
        assert_eq!(form.exam_type, Some(ExamType::Laboratorial));
    }
}
