use crate::error::ApiError;

pub const CONTACT_STATUSES: &[&str] = &["active", "inactive", "blocked"];
pub const DEAL_STATUSES: &[&str] = &["active", "won", "lost", "cancelled"];
pub const TENANT_STATUSES: &[&str] = &["active", "suspended", "inactive"];

pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::BadRequest(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        )));
    }
    Ok(())
}

/// Reject blank values with the given message, then bound the length.
pub fn check_required(
    value: &str,
    message: &str,
    field: &str,
    max: usize,
) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(message.into()));
    }
    check_length(field, value, 1, max)
}

pub fn check_email(value: &str) -> Result<(), ApiError> {
    check_length("email", value, 3, 254)?;
    let Some((local, domain)) = value.split_once('@') else {
        return Err(ApiError::BadRequest("invalid email address".into()));
    };
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || value.chars().any(char::is_whitespace)
    {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }
    Ok(())
}

pub fn check_password(value: &str) -> Result<(), ApiError> {
    if value.chars().count() < 6 {
        return Err(ApiError::BadRequest(
            "password must be at least 6 characters".into(),
        ));
    }
    check_length("password", value, 6, 128)
}

pub fn check_probability(value: i32) -> Result<(), ApiError> {
    if !(0..=100).contains(&value) {
        return Err(ApiError::BadRequest(
            "probability must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

pub fn check_contact_status(value: &str) -> Result<(), ApiError> {
    if !CONTACT_STATUSES.contains(&value) {
        return Err(ApiError::BadRequest(
            "invalid status. must be: active, inactive, or blocked".into(),
        ));
    }
    Ok(())
}

pub fn check_deal_status(value: &str) -> Result<(), ApiError> {
    if !DEAL_STATUSES.contains(&value) {
        return Err(ApiError::BadRequest(
            "invalid status: must be one of active, won, lost, cancelled".into(),
        ));
    }
    Ok(())
}

pub fn check_tenant_status(value: &str) -> Result<(), ApiError> {
    if !TENANT_STATUSES.contains(&value) {
        return Err(ApiError::BadRequest(
            "invalid status. must be: active, suspended, or inactive".into(),
        ));
    }
    Ok(())
}

pub fn check_tags(tags: &[String]) -> Result<(), ApiError> {
    if tags.len() > 50 {
        return Err(ApiError::BadRequest("max 50 tags".into()));
    }
    for tag in tags {
        check_length("tag", tag, 1, 100)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn message(err: ApiError) -> String {
        match err {
            ApiError::BadRequest(m) => m,
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    // -- check_length --

    #[test]
    fn length_counts_chars_not_bytes() {
        assert!(check_length("name", "Süßwaren", 1, 8).is_ok());
    }

    #[test]
    fn length_over_max_reports_field() {
        let m = message(check_length("name", &"a".repeat(11), 1, 10).unwrap_err());
        assert!(m.contains("name must be between 1 and 10"));
    }

    // -- check_required --

    #[test]
    fn required_rejects_blank_with_message() {
        let m = message(check_required("   ", "deal title is required", "title", 255).unwrap_err());
        assert_eq!(m, "deal title is required");
    }

    #[test]
    fn required_accepts_value() {
        assert!(check_required("Jane", "first name is required", "first name", 100).is_ok());
    }

    // -- check_email --

    #[rstest]
    #[case("jane@acme.test")]
    #[case("a@b")]
    #[case("first.last+tag@sub.example.com")]
    fn valid_emails(#[case] email: &str) {
        assert!(check_email(email).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("no-at-sign")]
    #[case("@acme.test")]
    #[case("jane@")]
    #[case("a@b@c")]
    #[case("jane doe@acme.test")]
    fn invalid_emails(#[case] email: &str) {
        assert!(check_email(email).is_err());
    }

    #[test]
    fn email_over_max_length() {
        let email = format!("{}@b.co", "a".repeat(250));
        assert!(check_email(&email).is_err());
    }

    // -- check_password --

    #[test]
    fn password_minimum_six() {
        assert!(check_password("secret").is_ok());
        let m = message(check_password("short").unwrap_err());
        assert_eq!(m, "password must be at least 6 characters");
    }

    // -- check_probability --

    #[rstest]
    #[case(0, true)]
    #[case(50, true)]
    #[case(100, true)]
    #[case(-1, false)]
    #[case(101, false)]
    fn probability_bounds(#[case] value: i32, #[case] ok: bool) {
        assert_eq!(check_probability(value).is_ok(), ok);
    }

    // -- statuses --

    #[rstest]
    #[case("active", true)]
    #[case("inactive", true)]
    #[case("blocked", true)]
    #[case("won", false)]
    #[case("ACTIVE", false)]
    fn contact_statuses(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(check_contact_status(value).is_ok(), ok);
    }

    #[rstest]
    #[case("active", true)]
    #[case("won", true)]
    #[case("lost", true)]
    #[case("cancelled", true)]
    #[case("closed", false)]
    fn deal_statuses(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(check_deal_status(value).is_ok(), ok);
    }

    #[test]
    fn deal_status_message() {
        let m = message(check_deal_status("archived").unwrap_err());
        assert_eq!(
            m,
            "invalid status: must be one of active, won, lost, cancelled"
        );
    }

    #[rstest]
    #[case("active", true)]
    #[case("suspended", true)]
    #[case("inactive", true)]
    #[case("blocked", false)]
    fn tenant_statuses(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(check_tenant_status(value).is_ok(), ok);
    }

    // -- check_tags --

    #[test]
    fn tags_limits() {
        assert!(check_tags(&["vip".into(), "b2b".into()]).is_ok());
        assert!(check_tags(&[String::new()]).is_err());
        let many: Vec<String> = (0..51).map(|i| format!("t{i}")).collect();
        assert!(check_tags(&many).is_err());
    }
}
