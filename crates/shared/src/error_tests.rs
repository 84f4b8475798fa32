use super::*;
use rstest::rstest;

#[rstest]
#[case(AppError::NotFound("test".into()), 404, "NOT_FOUND")]
#[case(AppError::Validation("test".into()), 400, "VALIDATION_ERROR")]
#[case(AppError::BusinessRule("test".into()), 422, "BUSINESS_RULE_VIOLATION")]
#[case(AppError::Conflict("test".into()), 409, "CONFLICT")]
#[case(AppError::Database("test".into()), 500, "DATABASE_ERROR")]
#[case(AppError::Internal("test".into()), 500, "INTERNAL_ERROR")]
fn test_app_error_status_and_code(
    #[case] error: AppError,
    #[case] status: u16,
    #[case] code: &str,
) {
    assert_eq!(error.status_code(), status);
    assert_eq!(error.error_code(), code);
}

#[test]
fn test_app_error_display() {
    assert_eq!(
        format!("{}", AppError::NotFound("Account 7".into())),
        "Not found: Account 7"
    );
    assert_eq!(
        format!("{}", AppError::Validation("msg".into())),
        "Validation error: msg"
    );
    assert_eq!(
        format!("{}", AppError::BusinessRule("msg".into())),
        "Business rule violation: msg"
    );
    assert_eq!(
        format!("{}", AppError::Conflict("msg".into())),
        "Conflict: msg"
    );
    assert_eq!(
        format!("{}", AppError::Database("msg".into())),
        "Database error: msg"
    );
    assert_eq!(
        format!("{}", AppError::Internal("msg".into())),
        "Internal error: msg"
    );
}

#[test]
fn test_server_error_classification() {
    assert!(AppError::Database(String::new()).is_server_error());
    assert!(AppError::Internal(String::new()).is_server_error());
    assert!(!AppError::NotFound(String::new()).is_server_error());
    assert!(!AppError::Validation(String::new()).is_server_error());
}
