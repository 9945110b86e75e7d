//! Database schema definitions
//!
//! Table and column names used with rusqlite, plus the DDL that creates them.

/// Statements creating every table and index; each is `IF NOT EXISTS`, so the
/// batch can run on every start.
pub const CREATE_TABLES: &str =
    include_str!("../migrations/2024-05-01-000000_create_health_tables/up.sql");

/// Engine-side timestamp expression with millisecond precision
pub const NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// `SET` clause refreshing `column` to now, or one millisecond past its
/// current value when now is not later
#[must_use]
pub fn touch(column: &str) -> String {
    format!(
        "{column} = CASE WHEN {NOW} > {column} THEN {NOW} \
         ELSE strftime('%Y-%m-%d %H:%M:%f', {column}, '+0.001 seconds') END"
    )
}

/// Tables in child-before-parent order, the order deletes and drops must follow
pub const TABLES_CHILD_FIRST: [&str; 3] = [exam_results::TABLE, exams::TABLE, user_profile::TABLE];

/// Exams table schema
pub mod exams {
    /// Table name
    pub const TABLE: &str = "exams";
    /// Primary key column
    pub const ID: &str = "id";
    /// Exam name column
    pub const NAME: &str = "name";
    /// Requesting doctor column
    pub const DOCTOR: &str = "doctor";
    /// Exam date column (`YYYY-MM-DD`)
    pub const DATE: &str = "date";
    /// Clinic column
    pub const CLINIC: &str = "clinic";
    /// Exam type column
    pub const TYPE: &str = "type";
    /// Base64 document image column
    pub const IMAGE_DATA: &str = "image_data";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
    /// Last update timestamp column
    pub const UPDATED_AT: &str = "updated_at";
}

/// Exam results table schema
pub mod exam_results {
    /// Table name
    pub const TABLE: &str = "exam_results";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to exams table
    pub const EXAM_ID: &str = "exam_id";
    /// Measured parameter column
    pub const PARAMETER_NAME: &str = "parameter_name";
    /// Measured value column
    pub const VALUE: &str = "value";
    /// Reference range column
    pub const REFERENCE_RANGE: &str = "reference_range";
    /// Unit column
    pub const UNIT: &str = "unit";
    /// Result status column
    pub const STATUS: &str = "status";
}

/// User profile table schema
pub mod user_profile {
    /// Table name
    pub const TABLE: &str = "user_profile";
    /// Primary key column
    pub const ID: &str = "id";
    /// Display name column
    pub const NAME: &str = "name";
    /// Email column
    pub const EMAIL: &str = "email";
    /// Age column
    pub const AGE: &str = "age";
    /// Phone column
    pub const PHONE: &str = "phone";
    /// Base64 profile picture column
    pub const PROFILE_IMAGE: &str = "profile_image";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
    /// Last update timestamp column
    pub const UPDATED_AT: &str = "updated_at";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_mentions_every_table() {
        for table in TABLES_CHILD_FIRST {
            assert!(CREATE_TABLES.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
    }

    #[test]
    fn touch_assigns_the_named_column() {
        let clause = touch(exams::UPDATED_AT);
        assert!(clause.starts_with("updated_at = CASE WHEN"));
        assert!(clause.contains("'+0.001 seconds'"));
    }

    #[test]
    fn children_come_before_parents() {
        let child = TABLES_CHILD_FIRST.iter().position(|t| *t == exam_results::TABLE);
        let parent = TABLES_CHILD_FIRST.iter().position(|t| *t == exams::TABLE);
        assert!(child < parent);
    }
}
