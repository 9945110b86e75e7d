use std::fs;
use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{StorageContext, StorageError};
use crate::models::{
    Exam, ExamCounts, ExamFilter, ExamForm, ExamResult, ExamResultForm, ExamType, ProfileForm, ResultStatus,
    UserProfile,
};
use crate::schema::{self, exam_results, exams, user_profile};

/// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
/// A connection checked out of the pool
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

type StorageResult<T> = std::result::Result<T, StorageError>;

/// The storage engine: owns the pool, the schema and every statement.
pub struct Database {
    pool: DbPool,
    location: String,
}

impl Database {
    /// Open (or create) the database file and make sure the schema exists
    pub fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(&config.path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(&config.path)
            .with_init(move |conn| configure_connection(conn, busy_timeout));
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)
            .map_err(|source| StorageError::Open {
                path: config.path.clone(),
                source,
            })?;

        let database = Self {
            pool,
            location: config.path.clone(),
        };
        database.initialize_schema()?;

        info!(path = %database.location, "Database opened");
        Ok(database)
    }

    /// A private in-memory database behind a single connection
    pub fn in_memory() -> StorageResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| configure_connection(conn, Duration::from_secs(5)));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|source| StorageError::Open {
                path: ":memory:".to_string(),
                source,
            })?;

        let database = Self {
            pool,
            location: ":memory:".to_string(),
        };
        database.initialize_schema()?;
        Ok(database)
    }

    /// Where the database lives (`:memory:` for in-memory databases)
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Get a connection from the pool
    pub fn get_connection(&self, operation: &'static str) -> StorageResult<DbConnection> {
        self.pool
            .get()
            .map_err(|source| StorageError::Connection { operation, source })
    }

    /// Create any missing table or index. Safe to call repeatedly.
    pub fn initialize_schema(&self) -> StorageResult<()> {
        let conn = self.get_connection("initialize_schema")?;
        conn.execute_batch(schema::CREATE_TABLES)
            .during("initialize_schema")?;

        debug!("Schema ensured");
        Ok(())
    }

    /// Insert an exam and return its new id
    pub fn insert_exam(&self, exam: &ExamForm) -> StorageResult<i64> {
        const OP: &str = "insert_exam";
        let conn = self.get_connection(OP)?;

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                exams::TABLE,
                exams::NAME,
                exams::DOCTOR,
                exams::DATE,
                exams::CLINIC,
                exams::TYPE,
                exams::IMAGE_DATA
            ),
            params![
                exam.name,
                exam.doctor,
                exam.date,
                exam.clinic,
                exam.exam_type.clone().unwrap_or_default().as_str(),
                exam.image_data
            ],
        )
        .during(OP)?;

        let id = conn.last_insert_rowid();
        debug!(id, "Exam inserted");
        Ok(id)
    }

    /// All exams, newest date first
    pub fn get_all_exams(&self) -> StorageResult<Vec<Exam>> {
        self.search_exams(&ExamFilter::default())
    }

    /// Exams narrowed by type and text, in the same order as `get_all_exams`
    pub fn search_exams(&self, filter: &ExamFilter) -> StorageResult<Vec<Exam>> {
        const OP: &str = "search_exams";
        let conn = self.get_connection(OP)?;

        let mut query = format!("SELECT * FROM {}", exams::TABLE);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(exam_type) = &filter.exam_type {
            query.push_str(&format!(" WHERE {} = ?", exams::TYPE));
            params.push(Box::new(exam_type.as_str().to_string()));
        }

        // Ties keep insertion order
        query.push_str(&format!(" ORDER BY {} DESC, {} ASC", exams::DATE, exams::ID));

        let mut stmt = conn.prepare(&query).during(OP)?;
        let exam_iter = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), map_exam)
            .during(OP)?;

        let mut results = Vec::new();
        for exam in exam_iter {
            let exam = exam.during(OP)?;
            // SQLite's lower() only folds ASCII, so text matching happens here
            if filter.matches_text(&exam) {
                results.push(exam);
            }
        }

        Ok(results)
    }

    /// Get an exam by ID
    pub fn get_exam_by_id(&self, id: i64) -> StorageResult<Option<Exam>> {
        const OP: &str = "get_exam_by_id";
        let conn = self.get_connection(OP)?;

        conn.query_row(
            &format!("SELECT * FROM {} WHERE {} = ?", exams::TABLE, exams::ID),
            params![id],
            map_exam,
        )
        .optional()
        .during(OP)
    }

    /// Replace every editable field of an exam. Returns false when no such exam exists.
    pub fn update_exam(&self, id: i64, exam: &ExamForm) -> StorageResult<bool> {
        const OP: &str = "update_exam";
        let conn = self.get_connection(OP)?;

        let changed = conn
            .execute(
                &format!(
                    "UPDATE {} SET {} = ?1, {} = ?2, {} = ?3, {} = ?4, {} = ?5, {} = ?6, {} WHERE {} = ?7",
                    exams::TABLE,
                    exams::NAME,
                    exams::DOCTOR,
                    exams::DATE,
                    exams::CLINIC,
                    exams::TYPE,
                    exams::IMAGE_DATA,
                    schema::touch(exams::UPDATED_AT),
                    exams::ID
                ),
                params![
                    exam.name,
                    exam.doctor,
                    exam.date,
                    exam.clinic,
                    exam.exam_type.clone().unwrap_or_default().as_str(),
                    exam.image_data,
                    id
                ],
            )
            .during(OP)?;

        debug!(id, found = changed > 0, "Exam updated");
        Ok(changed > 0)
    }

    /// Delete an exam together with its results. Returns false when no such exam exists.
    pub fn delete_exam(&self, id: i64) -> StorageResult<bool> {
        const OP: &str = "delete_exam";
        let mut conn = self.get_connection(OP)?;
        let tx = conn.transaction().during(OP)?;

        // The FK cascade would do this too; deleting explicitly keeps it independent of the pragma
        let results = tx
            .execute(
                &format!("DELETE FROM {} WHERE {} = ?", exam_results::TABLE, exam_results::EXAM_ID),
                params![id],
            )
            .during(OP)?;
        let deleted = tx
            .execute(
                &format!("DELETE FROM {} WHERE {} = ?", exams::TABLE, exams::ID),
                params![id],
            )
            .during(OP)?;

        tx.commit().during(OP)?;

        debug!(id, results, found = deleted > 0, "Exam deleted");
        Ok(deleted > 0)
    }

    /// Number of exams, in total and per known type
    pub fn exam_counts(&self) -> StorageResult<ExamCounts> {
        const OP: &str = "exam_counts";
        let conn = self.get_connection(OP)?;

        conn.query_row(
            &format!(
                "SELECT COUNT(*), COALESCE(SUM({t} = ?1), 0), COALESCE(SUM({t} = ?2), 0) FROM {}",
                exams::TABLE,
                t = exams::TYPE
            ),
            params![ExamType::Laboratorial.as_str(), ExamType::Imagem.as_str()],
            |row| {
                let count = |idx: usize| row.get::<_, i64>(idx).map(|n| u64::try_from(n).unwrap_or(0));
                Ok(ExamCounts {
                    total: count(0)?,
                    laboratorial: count(1)?,
                    imagem: count(2)?,
                })
            },
        )
        .during(OP)
    }

    /// Add a lab value to an existing exam and return its id
    pub fn insert_exam_result(&self, exam_id: i64, result: &ExamResultForm) -> StorageResult<i64> {
        const OP: &str = "insert_exam_result";
        let conn = self.get_connection(OP)?;

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                exam_results::TABLE,
                exam_results::EXAM_ID,
                exam_results::PARAMETER_NAME,
                exam_results::VALUE,
                exam_results::REFERENCE_RANGE,
                exam_results::UNIT,
                exam_results::STATUS
            ),
            params![
                exam_id,
                result.parameter_name,
                result.value,
                result.reference_range,
                result.unit,
                result.status.clone().unwrap_or_default().as_str()
            ],
        )
        .during(OP)?;

        Ok(conn.last_insert_rowid())
    }

    /// Lab values of one exam in insertion order
    pub fn get_exam_results(&self, exam_id: i64) -> StorageResult<Vec<ExamResult>> {
        const OP: &str = "get_exam_results";
        let conn = self.get_connection(OP)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC",
                exam_results::TABLE,
                exam_results::EXAM_ID,
                exam_results::ID
            ))
            .during(OP)?;

        let result_iter = stmt.query_map(params![exam_id], map_exam_result).during(OP)?;

        let mut results = Vec::new();
        for result in result_iter {
            results.push(result.during(OP)?);
        }

        Ok(results)
    }

    /// Delete one lab value. Returns false when no such row exists.
    pub fn delete_exam_result(&self, id: i64) -> StorageResult<bool> {
        const OP: &str = "delete_exam_result";
        let conn = self.get_connection(OP)?;

        let deleted = conn
            .execute(
                &format!("DELETE FROM {} WHERE {} = ?", exam_results::TABLE, exam_results::ID),
                params![id],
            )
            .during(OP)?;

        Ok(deleted > 0)
    }

    /// The profile, if the user has onboarded
    pub fn get_user_profile(&self) -> StorageResult<Option<UserProfile>> {
        const OP: &str = "get_user_profile";
        let conn = self.get_connection(OP)?;
        select_profile(&conn).during(OP)
    }

    /// Write the singleton profile: update the existing row, or insert the first one
    pub fn insert_or_update_user_profile(&self, profile: &ProfileForm) -> StorageResult<UserProfile> {
        const OP: &str = "insert_or_update_user_profile";
        let mut conn = self.get_connection(OP)?;

        // IMMEDIATE takes the write lock before the existence check
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .during(OP)?;

        let existing: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT {} FROM {} ORDER BY {} LIMIT 1",
                    user_profile::ID,
                    user_profile::TABLE,
                    user_profile::ID
                ),
                [],
                |row| row.get(0),
            )
            .optional()
            .during(OP)?;

        if let Some(id) = existing {
            tx.execute(
                &format!(
                    "UPDATE {} SET {} = ?1, {} = ?2, {} = ?3, {} = ?4, {} = ?5, {} WHERE {} = ?6",
                    user_profile::TABLE,
                    user_profile::NAME,
                    user_profile::EMAIL,
                    user_profile::AGE,
                    user_profile::PHONE,
                    user_profile::PROFILE_IMAGE,
                    schema::touch(user_profile::UPDATED_AT),
                    user_profile::ID
                ),
                params![profile.name, profile.email, profile.age, profile.phone, profile.profile_image, id],
            )
            .during(OP)?;
            debug!(id, "Profile updated");
        } else {
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5)",
                    user_profile::TABLE,
                    user_profile::NAME,
                    user_profile::EMAIL,
                    user_profile::AGE,
                    user_profile::PHONE,
                    user_profile::PROFILE_IMAGE
                ),
                params![profile.name, profile.email, profile.age, profile.phone, profile.profile_image],
            )
            .during(OP)?;
            debug!(id = tx.last_insert_rowid(), "Profile created");
        }

        let stored = select_profile(&tx)
            .during(OP)?
            .ok_or(StorageError::Statement {
                operation: OP,
                source: rusqlite::Error::QueryReturnedNoRows,
            })?;
        tx.commit().during(OP)?;

        Ok(stored)
    }

    /// Drop every table and create the schema again
    pub fn reset_database(&self) -> StorageResult<()> {
        const OP: &str = "reset_database";
        let mut conn = self.get_connection(OP)?;
        let tx = conn.transaction().during(OP)?;

        for table in schema::TABLES_CHILD_FIRST {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))
                .during(OP)?;
        }
        tx.execute_batch(schema::CREATE_TABLES).during(OP)?;

        tx.commit().during(OP)?;

        info!("Database reset");
        Ok(())
    }

    /// Delete every row and restart the id counters; the schema is kept
    pub fn clear_all_data(&self) -> StorageResult<()> {
        const OP: &str = "clear_all_data";
        let mut conn = self.get_connection(OP)?;
        let tx = conn.transaction().during(OP)?;

        for table in schema::TABLES_CHILD_FIRST {
            tx.execute_batch(&format!("DELETE FROM {table};"))
                .during(OP)?;
        }
        tx.execute(
            "DELETE FROM sqlite_sequence WHERE name IN (?1, ?2, ?3)",
            params![exams::TABLE, exam_results::TABLE, user_profile::TABLE],
        )
        .during(OP)?;

        tx.commit().during(OP)?;

        info!("All data cleared");
        Ok(())
    }

    /// Names of the user tables currently present
    pub fn table_names(&self) -> StorageResult<Vec<String>> {
        const OP: &str = "table_names";
        let conn = self.get_connection(OP)?;

        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .during(OP)?;
        let names = stmt.query_map([], |row| row.get(0)).during(OP)?;

        let mut results = Vec::new();
        for name in names {
            results.push(name.during(OP)?);
        }
        Ok(results)
    }
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

fn select_profile(conn: &Connection) -> rusqlite::Result<Option<UserProfile>> {
    conn.query_row(
        &format!(
            "SELECT * FROM {} ORDER BY {} LIMIT 1",
            user_profile::TABLE,
            user_profile::ID
        ),
        [],
        map_profile,
    )
    .optional()
}

/// Map a database row to an Exam
fn map_exam(row: &Row) -> rusqlite::Result<Exam> {
    Ok(Exam {
        id: row.get(exams::ID)?,
        name: row.get(exams::NAME)?,
        doctor: row.get(exams::DOCTOR)?,
        date: row.get(exams::DATE)?,
        clinic: row.get(exams::CLINIC)?,
        exam_type: row
            .get::<_, Option<String>>(exams::TYPE)?
            .map(ExamType::from)
            .unwrap_or_default(),
        image_data: row.get(exams::IMAGE_DATA)?,
        created_at: row.get(exams::CREATED_AT)?,
        updated_at: row.get(exams::UPDATED_AT)?,
    })
}

/// Map a database row to an ExamResult
fn map_exam_result(row: &Row) -> rusqlite::Result<ExamResult> {
    Ok(ExamResult {
        id: row.get(exam_results::ID)?,
        exam_id: row.get(exam_results::EXAM_ID)?,
        parameter_name: row.get(exam_results::PARAMETER_NAME)?,
        value: row.get(exam_results::VALUE)?,
        reference_range: row.get(exam_results::REFERENCE_RANGE)?,
        unit: row.get(exam_results::UNIT)?,
        status: row
            .get::<_, Option<String>>(exam_results::STATUS)?
            .map(ResultStatus::from)
            .unwrap_or_default(),
    })
}

/// Map a database row to a UserProfile
fn map_profile(row: &Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(user_profile::ID)?,
        name: row.get(user_profile::NAME)?,
        email: row.get(user_profile::EMAIL)?,
        age: row.get(user_profile::AGE)?,
        phone: row.get(user_profile::PHONE)?,
        profile_image: row.get(user_profile::PROFILE_IMAGE)?,
        created_at: row.get(user_profile::CREATED_AT)?,
        updated_at: row.get(user_profile::UPDATED_AT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn in_memory_database_has_all_tables() {
        let db = Database::in_memory().unwrap();
        assert_eq!(
            db.table_names().unwrap(),
            vec!["exam_results", "exams", "user_profile"]
        );
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let db = Database::in_memory().unwrap();
        let form = ExamResultForm {
            parameter_name: "Glicose".to_string(),
            ..ExamResultForm::default()
        };

        let err = db.insert_exam_result(999, &form).unwrap_err();
        assert!(matches!(err, StorageError::Statement { operation: "insert_exam_result", .. }));
    }

    #[test]
    fn omitted_type_is_stored_as_laboratorial() {
        let db = Database::in_memory().unwrap();
        let id = db.insert_exam(&ExamForm::new("Hemograma", date(2024, 5, 1))).unwrap();

        let exam = db.get_exam_by_id(id).unwrap().unwrap();
        assert_eq!(exam.exam_type, ExamType::Laboratorial);
        assert_eq!(exam.created_at, exam.updated_at);
    }

    #[test]
    fn counts_by_type() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.exam_counts().unwrap(), ExamCounts::default());

        db.insert_exam(&ExamForm::new("Hemograma", date(2024, 1, 1))).unwrap();
        db.insert_exam(&ExamForm::new("Raio X", date(2024, 1, 2)).with_type(ExamType::Imagem))
            .unwrap();
        db.insert_exam(&ExamForm::new("Consulta", date(2024, 1, 3)).with_type(ExamType::Outros))
            .unwrap();

        let counts = db.exam_counts().unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.laboratorial, 1);
        assert_eq!(counts.imagem, 1);
    }
}
