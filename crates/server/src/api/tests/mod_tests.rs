use super::*;

#[test]
fn validation_errors_are_client_errors() {
    assert_eq!(status_for(ErrorCode::Validation), StatusCode::BAD_REQUEST);
}

#[test]
fn storage_errors_are_server_errors() {
    assert!(status_for(ErrorCode::Storage).is_server_error());
    assert!(status_for(ErrorCode::Internal).is_server_error());
}

#[test]
fn reject_pairs_status_with_error_body() {
    let (status, Json(body)) = reject(ApiError::validation("name_on_order cannot be empty"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.code, ErrorCode::Validation);
}
