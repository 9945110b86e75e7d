//! WalletCare - On-device Health Records
//!
//! Local persistence for a personal health record app: medical exams with
//! their document images, structured lab values, and the single user's
//! profile, all kept in one SQLite file.
//!
//! # Features
//!
//! - Exam CRUD with newest-first listing, type filters and text search
//! - Lab values that are removed together with their exam
//! - A singleton user profile that doubles as the onboarding check
//! - Base64 round-tripping of document and profile images
//! - Destructive maintenance: clear every row, or drop and recreate the schema

/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Image file encoding and decoding
pub mod image_codec;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Access facade used by the app's screens
pub mod service;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use config::AppConfig;
pub use db::Database;
pub use error::{CodecError, Result, StorageError, WalletCareError};
pub use image_codec::ImageCodec;
pub use models::{
    Exam, ExamCounts, ExamFilter, ExamForm, ExamResult, ExamResultForm, ExamType, ProfileForm, ResultStatus,
    UserProfile,
};
pub use repository::{HealthRepository, SqliteHealthRepository};
pub use service::HealthService;
