use std::sync::Arc;

use async_trait::async_trait;

use crate::db::Database;
use crate::error::StorageError;
use crate::logging::OperationTimer;
use crate::metrics::StorageMetrics;
use crate::models::{Exam, ExamCounts, ExamFilter, ExamForm, ExamResult, ExamResultForm, ProfileForm, UserProfile};

type StorageResult<T> = std::result::Result<T, StorageError>;

/// Async access to the stored health records.
///
/// Every call suspends the caller until the engine has finished; none of
/// them blocks the async executor.
#[async_trait]
pub trait HealthRepository: Send + Sync {
    /// Insert an exam and return its id
    async fn insert_exam(&self, exam: ExamForm) -> StorageResult<i64>;
    /// All exams, newest date first
    async fn get_all_exams(&self) -> StorageResult<Vec<Exam>>;
    /// Exams narrowed by type and text
    async fn search_exams(&self, filter: ExamFilter) -> StorageResult<Vec<Exam>>;
    /// One exam, or `None`
    async fn get_exam_by_id(&self, id: i64) -> StorageResult<Option<Exam>>;
    /// Replace an exam's fields; false when it does not exist
    async fn update_exam(&self, id: i64, exam: ExamForm) -> StorageResult<bool>;
    /// Delete an exam and its results; false when it does not exist
    async fn delete_exam(&self, id: i64) -> StorageResult<bool>;
    /// Totals per exam type
    async fn exam_counts(&self) -> StorageResult<ExamCounts>;
    /// Add a lab value to an exam
    async fn insert_exam_result(&self, exam_id: i64, result: ExamResultForm) -> StorageResult<i64>;
    /// Lab values of one exam
    async fn get_exam_results(&self, exam_id: i64) -> StorageResult<Vec<ExamResult>>;
    /// Delete one lab value; false when it does not exist
    async fn delete_exam_result(&self, id: i64) -> StorageResult<bool>;
    /// The profile, or `None` before onboarding
    async fn get_user_profile(&self) -> StorageResult<Option<UserProfile>>;
    /// Write the singleton profile and return it
    async fn insert_or_update_user_profile(&self, profile: ProfileForm) -> StorageResult<UserProfile>;
    /// Drop and recreate every table
    async fn reset_database(&self) -> StorageResult<()>;
    /// Delete every row and restart id counters
    async fn clear_all_data(&self) -> StorageResult<()>;
}

/// `HealthRepository` backed by the SQLite storage engine
pub struct SqliteHealthRepository {
    db: Arc<Database>,
}

impl SqliteHealthRepository {
    /// Wrap an opened database
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// The underlying storage engine
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run one engine call on the blocking pool, timing it and recording its outcome
    async fn run<T, F>(&self, operation: &'static str, call: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StorageResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let timer = OperationTimer::new(operation);

        let result = tokio::task::spawn_blocking(move || call(&db))
            .await
            .map_err(|source| StorageError::Task { operation, source })
            .and_then(|inner| inner);

        StorageMetrics::record_operation(operation, timer.finish(), result.is_ok());
        result
    }
}

#[async_trait]
impl HealthRepository for SqliteHealthRepository {
    async fn insert_exam(&self, exam: ExamForm) -> StorageResult<i64> {
        self.run("insert_exam", move |db| db.insert_exam(&exam)).await
    }

    async fn get_all_exams(&self) -> StorageResult<Vec<Exam>> {
        self.run("get_all_exams", Database::get_all_exams).await
    }

    async fn search_exams(&self, filter: ExamFilter) -> StorageResult<Vec<Exam>> {
        self.run("search_exams", move |db| db.search_exams(&filter)).await
    }

    async fn get_exam_by_id(&self, id: i64) -> StorageResult<Option<Exam>> {
        self.run("get_exam_by_id", move |db| db.get_exam_by_id(id)).await
    }

    async fn update_exam(&self, id: i64, exam: ExamForm) -> StorageResult<bool> {
        self.run("update_exam", move |db| db.update_exam(id, &exam)).await
    }

    async fn delete_exam(&self, id: i64) -> StorageResult<bool> {
        self.run("delete_exam", move |db| db.delete_exam(id)).await
    }

    async fn exam_counts(&self) -> StorageResult<ExamCounts> {
        self.run("exam_counts", Database::exam_counts).await
    }

    async fn insert_exam_result(&self, exam_id: i64, result: ExamResultForm) -> StorageResult<i64> {
        self.run("insert_exam_result", move |db| db.insert_exam_result(exam_id, &result))
            .await
    }

    async fn get_exam_results(&self, exam_id: i64) -> StorageResult<Vec<ExamResult>> {
        self.run("get_exam_results", move |db| db.get_exam_results(exam_id))
            .await
    }

    async fn delete_exam_result(&self, id: i64) -> StorageResult<bool> {
        self.run("delete_exam_result", move |db| db.delete_exam_result(id))
            .await
    }

    async fn get_user_profile(&self) -> StorageResult<Option<UserProfile>> {
        self.run("get_user_profile", Database::get_user_profile).await
    }

    async fn insert_or_update_user_profile(&self, profile: ProfileForm) -> StorageResult<UserProfile> {
        self.run("insert_or_update_user_profile", move |db| {
            db.insert_or_update_user_profile(&profile)
        })
        .await
    }

    async fn reset_database(&self) -> StorageResult<()> {
        self.run("reset_database", Database::reset_database).await
    }

    async fn clear_all_data(&self) -> StorageResult<()> {
        self.run("clear_all_data", Database::clear_all_data).await
    }
}
