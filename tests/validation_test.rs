//! Tests for the checks applied before forms reach storage

use chrono::NaiveDate;
use walletcare::models::{ExamForm, ExamResultForm, ProfileForm};
use walletcare::validation::InputValidator;
use walletcare::WalletCareError;

#[test]
fn test_validate_exam_name_valid() {
    assert!(InputValidator::validate_exam_name("Hemograma completo").is_ok());
    assert!(InputValidator::validate_exam_name("Ultrassonografia abdômen").is_ok());
}

#[test]
fn test_validate_exam_name_blank() {
    assert!(InputValidator::validate_exam_name("").is_err());
    assert!(InputValidator::validate_exam_name("   ").is_err());
}

#[test]
fn test_validate_exam_name_length_boundary() {
    assert!(InputValidator::validate_exam_name(&"é".repeat(200)).is_ok());
    assert!(InputValidator::validate_exam_name(&"a".repeat(201)).is_err());
}

#[test]
fn test_validate_exam_name_control_characters() {
    assert!(InputValidator::validate_exam_name("Hemo\0grama").is_err());
    assert!(InputValidator::validate_exam_name("Hemo\ngrama").is_err());
}

#[test]
fn test_validation_errors_are_validation_variant() {
    let err = InputValidator::validate_exam_name("").unwrap_err();
    assert!(matches!(err, WalletCareError::Validation(_)));
}

#[test]
fn test_parse_exam_date_valid() {
    assert_eq!(
        InputValidator::parse_exam_date("2024-02-29").unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    );
    assert!(InputValidator::parse_exam_date(" 2024-05-01 ").is_ok());
}

#[test]
fn test_parse_exam_date_rejects_impossible_dates() {
    assert!(InputValidator::parse_exam_date("2024-02-30").is_err());
    assert!(InputValidator::parse_exam_date("2023-02-29").is_err());
    assert!(InputValidator::parse_exam_date("2024-13-01").is_err());
}

#[test]
fn test_parse_exam_date_rejects_other_formats() {
    assert!(InputValidator::parse_exam_date("01/05/2024").is_err());
    assert!(InputValidator::parse_exam_date("2024-5-1").is_err());
    assert!(InputValidator::parse_exam_date("").is_err());
}

#[test]
fn test_validate_exam_form() {
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

    assert!(InputValidator::validate_exam_form(&ExamForm::new("Hemograma", date)).is_ok());
    assert!(InputValidator::validate_exam_form(&ExamForm::new("", date)).is_err());

    let long_clinic = ExamForm::new("Hemograma", date).with_clinic("c".repeat(201));
    assert!(InputValidator::validate_exam_form(&long_clinic).is_err());
}

#[test]
fn test_validate_email() {
    assert!(InputValidator::validate_email("maria@example.com").is_ok());
    assert!(InputValidator::validate_email("maria.souza@clinica.com.br").is_ok());

    assert!(InputValidator::validate_email("maria").is_err());
    assert!(InputValidator::validate_email("maria@").is_err());
    assert!(InputValidator::validate_email("maria @example.com").is_err());
    assert!(InputValidator::validate_email(&format!("{}@example.com", "a".repeat(250))).is_err());
}

#[test]
fn test_validate_phone() {
    assert!(InputValidator::validate_phone("(11) 98765-4321").is_ok());
    assert!(InputValidator::validate_phone("(11) 3456-7890").is_ok());

    assert!(InputValidator::validate_phone("11987654321").is_err());
    assert!(InputValidator::validate_phone("(11) 987-4321").is_err());
    assert!(InputValidator::validate_phone("(1) 98765-4321").is_err());
}

#[test]
fn test_format_phone() {
    assert_eq!(InputValidator::format_phone("11987654321"), "(11) 98765-4321");
    assert_eq!(InputValidator::format_phone("1134567890"), "(11) 3456-7890");
    assert_eq!(InputValidator::format_phone("(11) 98765 4321"), "(11) 98765-4321");
    assert_eq!(InputValidator::format_phone("12-34"), "1234");
}

#[test]
fn test_format_phone_keeps_digits_past_eleven() {
    assert_eq!(InputValidator::format_phone("119876543210"), "(11) 98765-43210");
    assert_eq!(InputValidator::format_phone("+55 11 98765-4321"), "(55) 11987-654321");
}

#[test]
fn test_formatted_phone_passes_validation() {
    let formatted = InputValidator::format_phone("21 9 8765 4321");
    assert!(InputValidator::validate_phone(&formatted).is_ok());
}

#[test]
fn test_validate_age() {
    assert!(InputValidator::validate_age(0).is_ok());
    assert!(InputValidator::validate_age(150).is_ok());
    assert!(InputValidator::validate_age(151).is_err());
}

#[test]
fn test_validate_profile_form() {
    assert!(InputValidator::validate_profile_form(&ProfileForm::default()).is_ok());

    let complete = ProfileForm {
        name: Some("Maria".to_string()),
        email: Some("maria@example.com".to_string()),
        age: Some(34),
        phone: Some("(11) 98765-4321".to_string()),
        profile_image: None,
    };
    assert!(InputValidator::validate_profile_form(&complete).is_ok());

    let bad_email = ProfileForm {
        email: Some("maria".to_string()),
        ..complete.clone()
    };
    assert!(InputValidator::validate_profile_form(&bad_email).is_err());

    let bad_age = ProfileForm {
        age: Some(200),
        ..complete
    };
    assert!(InputValidator::validate_profile_form(&bad_age).is_err());
}

#[test]
fn test_validate_result_form() {
    let valid = ExamResultForm {
        parameter_name: "Glicose".to_string(),
        ..ExamResultForm::default()
    };
    assert!(InputValidator::validate_result_form(&valid).is_ok());
    assert!(InputValidator::validate_result_form(&ExamResultForm::default()).is_err());
}
