//! The access facade screens call into.
//!
//! `HealthService` validates forms, hands them to a [`HealthRepository`] and
//! passes failures back unchanged. The database is opened once, on `open()` or
//! on the first operation, and shared by every later call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{AppConfig, DatabaseConfig};
use crate::db::Database;
use crate::error::{CodecError, Result, StorageError};
use crate::image_codec::ImageCodec;
use crate::models::{Exam, ExamCounts, ExamFilter, ExamForm, ExamResult, ExamResultForm, ProfileForm, UserProfile};
use crate::repository::{HealthRepository, SqliteHealthRepository};
use crate::validation::InputValidator;

/// File name decoded profile pictures are written to
pub const PROFILE_IMAGE_NAME: &str = "profile.jpg";

/// File name decoded exam documents are written to
#[must_use]
pub fn exam_image_name(exam_id: i64) -> String {
    format!("exam_{exam_id}.jpg")
}

/// Typed entry point for every stored-record operation
pub struct HealthService {
    database: Option<DatabaseConfig>,
    codec: ImageCodec,
    // Held across initialisation so concurrent first callers share one open
    repository: Mutex<Option<Arc<dyn HealthRepository>>>,
}

impl HealthService {
    /// A closed service; the database opens on first use
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            database: Some(config.database.clone()),
            codec: ImageCodec::new(&config.images.directory),
            repository: Mutex::new(None),
        }
    }

    /// A service over an already opened repository
    pub fn with_repository(repository: Arc<dyn HealthRepository>, codec: ImageCodec) -> Self {
        Self {
            database: None,
            codec,
            repository: Mutex::new(Some(repository)),
        }
    }

    /// Open the database if it is not open yet
    pub async fn open(&self) -> Result<()> {
        self.repository().await.map(|_| ())
    }

    /// Release the database handle. Returns whether it was open.
    pub async fn close(&self) -> bool {
        let closed = self.repository.lock().await.take().is_some();
        if closed {
            info!("Storage closed");
        }
        closed
    }

    /// Whether the database handle is currently held
    pub async fn is_open(&self) -> bool {
        self.repository.lock().await.is_some()
    }

    /// The shared repository, opening the database on first use
    pub async fn repository(&self) -> Result<Arc<dyn HealthRepository>> {
        let mut slot = self.repository.lock().await;
        if let Some(repository) = slot.as_ref() {
            return Ok(Arc::clone(repository));
        }

        let config = self.database.clone().ok_or(StorageError::Closed)?;
        let db = tokio::task::spawn_blocking(move || Database::new(&config))
            .await
            .map_err(|source| StorageError::Task {
                operation: "open",
                source,
            })?
            .inspect_err(|e| warn!(error = %e, "Failed to open database"))?;

        let repository: Arc<dyn HealthRepository> = Arc::new(SqliteHealthRepository::new(db));
        *slot = Some(Arc::clone(&repository));
        Ok(repository)
    }

    /// Validate and insert an exam, returning its id
    pub async fn insert_exam(&self, exam: ExamForm) -> Result<i64> {
        let exam = exam.normalized();
        InputValidator::validate_exam_form(&exam)?;
        let repository = self.repository().await?;
        logged("insert_exam", repository.insert_exam(exam).await)
    }

    /// All exams, newest date first
    pub async fn get_all_exams(&self) -> Result<Vec<Exam>> {
        let repository = self.repository().await?;
        logged("get_all_exams", repository.get_all_exams().await)
    }

    /// Exams narrowed by type and text
    pub async fn search_exams(&self, filter: ExamFilter) -> Result<Vec<Exam>> {
        let repository = self.repository().await?;
        logged("search_exams", repository.search_exams(filter).await)
    }

    /// One exam, or `None` when it does not exist
    pub async fn get_exam_by_id(&self, id: i64) -> Result<Option<Exam>> {
        let repository = self.repository().await?;
        logged("get_exam_by_id", repository.get_exam_by_id(id).await)
    }

    /// Validate and fully replace an exam; false when it does not exist
    pub async fn update_exam(&self, id: i64, exam: ExamForm) -> Result<bool> {
        let exam = exam.normalized();
        InputValidator::validate_exam_form(&exam)?;
        let repository = self.repository().await?;
        logged("update_exam", repository.update_exam(id, exam).await)
    }

    /// Delete an exam and its results; false when it does not exist
    pub async fn delete_exam(&self, id: i64) -> Result<bool> {
        let repository = self.repository().await?;
        logged("delete_exam", repository.delete_exam(id).await)
    }

    /// Totals per exam type
    pub async fn exam_counts(&self) -> Result<ExamCounts> {
        let repository = self.repository().await?;
        logged("exam_counts", repository.exam_counts().await)
    }

    /// Validate and add a lab value to an exam
    pub async fn add_exam_result(&self, exam_id: i64, result: ExamResultForm) -> Result<i64> {
        let result = result.normalized();
        InputValidator::validate_result_form(&result)?;
        let repository = self.repository().await?;
        logged("insert_exam_result", repository.insert_exam_result(exam_id, result).await)
    }

    /// Lab values of one exam
    pub async fn get_exam_results(&self, exam_id: i64) -> Result<Vec<ExamResult>> {
        let repository = self.repository().await?;
        logged("get_exam_results", repository.get_exam_results(exam_id).await)
    }

    /// Delete one lab value; false when it does not exist
    pub async fn delete_exam_result(&self, id: i64) -> Result<bool> {
        let repository = self.repository().await?;
        logged("delete_exam_result", repository.delete_exam_result(id).await)
    }

    /// The profile, or `None` before onboarding
    pub async fn get_user_profile(&self) -> Result<Option<UserProfile>> {
        let repository = self.repository().await?;
        logged("get_user_profile", repository.get_user_profile().await)
    }

    /// Whether the user has saved a profile yet
    pub async fn is_onboarded(&self) -> Result<bool> {
        Ok(self.get_user_profile().await?.is_some())
    }

    /// Validate and save the singleton profile
    pub async fn insert_or_update_user_profile(&self, profile: ProfileForm) -> Result<UserProfile> {
        let profile = profile.normalized();
        InputValidator::validate_profile_form(&profile)?;
        let repository = self.repository().await?;
        logged(
            "insert_or_update_user_profile",
            repository.insert_or_update_user_profile(profile).await,
        )
    }

    /// Drop and recreate every table
    pub async fn reset_database(&self) -> Result<()> {
        let repository = self.repository().await?;
        logged("reset_database", repository.reset_database().await)
    }

    /// Delete every row and restart id counters
    pub async fn clear_all_data(&self) -> Result<()> {
        let repository = self.repository().await?;
        logged("clear_all_data", repository.clear_all_data().await)
    }

    /// Read an image file into base64 text ready for a form
    pub async fn encode_image(&self, source: &Path) -> Result<String> {
        let codec = self.codec.clone();
        let source = source.to_path_buf();
        let result = tokio::task::spawn_blocking(move || codec.encode(&source))
            .await
            .map_err(CodecError::Task)
            .and_then(|inner| inner);
        logged("encode_image", result)
    }

    /// Write base64 text to `<image dir>/<suggested_name>` and return the file
    pub async fn decode_image(&self, encoded: &str, suggested_name: &str) -> Result<PathBuf> {
        let codec = self.codec.clone();
        let encoded = encoded.to_string();
        let suggested_name = suggested_name.to_string();
        let result = tokio::task::spawn_blocking(move || codec.decode(&encoded, &suggested_name))
            .await
            .map_err(CodecError::Task)
            .and_then(|inner| inner);
        logged("decode_image", result)
    }

    /// Decode an exam's document to `exam_<id>.jpg`; `None` when it has no image
    pub async fn exam_image_file(&self, exam: &Exam) -> Result<Option<PathBuf>> {
        match exam.image_data.as_deref() {
            Some(encoded) => self.decode_image(encoded, &exam_image_name(exam.id)).await.map(Some),
            None => Ok(None),
        }
    }

    /// Decode the profile picture to `profile.jpg`; `None` when there is none
    pub async fn profile_image_file(&self, profile: &UserProfile) -> Result<Option<PathBuf>> {
        match profile.profile_image.as_deref() {
            Some(encoded) => self.decode_image(encoded, PROFILE_IMAGE_NAME).await.map(Some),
            None => Ok(None),
        }
    }
}

fn logged<T, E>(operation: &'static str, result: std::result::Result<T, E>) -> Result<T>
where
    E: std::error::Error + Into<crate::error::WalletCareError>,
{
    result
        .inspect_err(|e| warn!(operation, error = %e, "Operation failed"))
        .map_err(Into::into)
}
