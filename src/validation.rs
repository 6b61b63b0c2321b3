//! Request body validation.
//!
//! Bodies are checked in two steps: serde rejects unknown or mistyped keys,
//! then [`Validate`] applies field rules and reports every failing field.

use axum::{extract::rejection::JsonRejection, Json};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::SecurityConfig;
use crate::error::{ApiError, ApiResult};

pub type FieldErrors = BTreeMap<String, String>;

/// Configured limits that some payloads are checked or transformed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadRules {
    pub password_min_length: usize,
    pub bcrypt_cost: u32,
}

impl From<&SecurityConfig> for PayloadRules {
    fn from(security: &SecurityConfig) -> Self {
        Self {
            password_min_length: security.password_min_length,
            bcrypt_cost: security.bcrypt_cost,
        }
    }
}

pub trait Validate {
    fn validate(&self, errors: &mut FieldErrors);

    /// Checks that need configuration. Payloads without any keep the default.
    fn validate_with(&self, rules: &PayloadRules, errors: &mut FieldErrors) {
        let _ = rules;
        self.validate(errors);
    }
}

/// Ordered `(column, value)` pairs for a partial update. Columns come from
/// the implementing type, never from the request.
pub trait UpdateFields {
    fn into_fields(self, rules: &PayloadRules) -> ApiResult<Vec<(&'static str, Value)>>;
}

/// One field of a PATCH body: absent keeps the column, `null` clears it,
/// anything else sets it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }
}

// Absent keys never reach here; fields carry #[serde(default)]
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            None => Patch::Clear,
            Some(value) => Patch::Set(value),
        })
    }
}

/// Decode and validate a JSON body. Keys starting with `_` (such as
/// `_token`) are transport metadata and are dropped before decoding.
pub fn parse_body<T>(body: Result<Json<Value>, JsonRejection>, rules: &PayloadRules) -> ApiResult<T>
where
    T: DeserializeOwned + Validate,
{
    let Json(mut value) = body?;
    if let Value::Object(map) = &mut value {
        map.retain(|key, _| !key.starts_with('_'));
    }

    let parsed: T = serde_json::from_value(value)
        .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e), None))?;

    let mut errors = FieldErrors::new();
    parsed.validate_with(rules, &mut errors);
    ensure_valid(errors)?;
    Ok(parsed)
}

/// Fail with every collected field error, if there are any.
pub fn ensure_valid(errors: FieldErrors) -> ApiResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Invalid request body", Some(errors)))
    }
}

/// Decode a partial update body into its field list. An update that names
/// no fields is a client error.
pub fn parse_update<T>(
    body: Result<Json<Value>, JsonRejection>,
    rules: &PayloadRules,
) -> ApiResult<Vec<(&'static str, Value)>>
where
    T: DeserializeOwned + Validate + UpdateFields,
{
    let fields = parse_body::<T>(body, rules)?.into_fields(rules)?;
    if fields.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    Ok(fields)
}

/// Push `(column, value)` when the optional field was supplied.
pub fn push_field<V: Into<Value>>(fields: &mut Vec<(&'static str, Value)>, column: &'static str, value: Option<V>) {
    if let Some(value) = value {
        fields.push((column, value.into()));
    }
}

/// Push a nullable column: `null` for a clear, the value for a set.
pub fn push_patch<V: Into<Value>>(fields: &mut Vec<(&'static str, Value)>, column: &'static str, patch: Patch<V>) {
    match patch {
        Patch::Keep => {}
        Patch::Clear => fields.push((column, Value::Null)),
        Patch::Set(value) => fields.push((column, value.into())),
    }
}

pub fn check_handle(errors: &mut FieldErrors, field: &str, value: &str) {
    if let Err(msg) = validate_username_format(value) {
        errors.insert(field.to_string(), msg);
    }
}

pub fn check_not_blank(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), format!("{} cannot be empty", field));
    }
}

pub fn check_email(errors: &mut FieldErrors, field: &str, value: &str) {
    if let Err(msg) = validate_email_format(value) {
        errors.insert(field.to_string(), msg);
    }
}

pub fn check_url(errors: &mut FieldErrors, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => {
            errors.insert(field.to_string(), "Must be an http(s) URL".to_string());
        }
    }
}

/// Usernames and company handles: 1-50 chars of letters, digits, `_` or `-`,
/// starting with a letter or digit.
pub fn validate_username_format(username: &str) -> Result<(), String> {
    let Some(first) = username.chars().next() else {
        return Err("Cannot be empty".to_string());
    };

    if username.len() > 50 {
        return Err("Must be less than 50 characters".to_string());
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err("Can only contain letters, numbers, underscore, and hyphen".to_string());
    }

    if !first.is_alphanumeric() {
        return Err("Must start with a letter or number".to_string());
    }

    Ok(())
}

pub fn validate_email_format(email: &str) -> Result<(), String> {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("Invalid email format".to_string());
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    const RULES: PayloadRules = PayloadRules { password_min_length: 5, bcrypt_cost: 4 };

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Rename {
        name: Option<String>,
        email: Option<String>,
        #[serde(default)]
        nickname: Patch<String>,
    }

    impl Validate for Rename {
        fn validate(&self, errors: &mut FieldErrors) {
            if let Some(email) = &self.email {
                check_email(errors, "email", email);
            }
        }
    }

    impl UpdateFields for Rename {
        fn into_fields(self, _rules: &PayloadRules) -> ApiResult<Vec<(&'static str, Value)>> {
            let mut fields = Vec::new();
            push_field(&mut fields, "name", self.name);
            push_field(&mut fields, "email", self.email);
            push_patch(&mut fields, "nickname", self.nickname);
            Ok(fields)
        }
    }

    #[test]
    fn token_key_is_stripped() {
        let fields = parse_update::<Rename>(Ok(Json(json!({"_token": "abc", "name": "x"}))), &RULES).unwrap();
        assert_eq!(fields, vec![("name", json!("x"))]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_body::<Rename>(Ok(Json(json!({"is_admin": true}))), &RULES).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn field_errors_are_reported() {
        let err = parse_body::<Rename>(Ok(Json(json!({"email": "nope"}))), &RULES).unwrap_err();
        match err {
            ApiError::ValidationError { field_errors: Some(fields), .. } => {
                assert_eq!(fields["email"], "Invalid email format");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn empty_update_is_bad_request() {
        let err = parse_update::<Rename>(Ok(Json(json!({"_token": "abc"}))), &RULES).unwrap_err();
        assert_eq!(err.message(), "No fields to update");
    }

    #[test]
    fn null_clears_and_absent_keeps() {
        let fields = parse_update::<Rename>(Ok(Json(json!({"nickname": null}))), &RULES).unwrap();
        assert_eq!(fields, vec![("nickname", Value::Null)]);

        let fields = parse_update::<Rename>(Ok(Json(json!({"nickname": "Tim", "name": "x"}))), &RULES).unwrap();
        assert_eq!(fields, vec![("name", json!("x")), ("nickname", json!("Tim"))]);

        let fields = parse_update::<Rename>(Ok(Json(json!({"name": "x"}))), &RULES).unwrap();
        assert_eq!(fields, vec![("name", json!("x"))]);
    }

    #[test]
    fn username_rules() {
        assert!(validate_username_format("user1").is_ok());
        assert!(validate_username_format("apple-inc").is_ok());
        assert!(validate_username_format("").is_err());
        assert!(validate_username_format("-leading").is_err());
        assert!(validate_username_format("has space").is_err());
        assert!(validate_username_format(&"a".repeat(51)).is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email_format("user1@email.com").is_ok());
        assert!(validate_email_format("user1email.com").is_err());
        assert!(validate_email_format("a@b@c.com").is_err());
        assert!(validate_email_format("@email.com").is_err());
        assert!(validate_email_format("user@localhost").is_err());
    }

    #[test]
    fn url_rules() {
        let mut errors = FieldErrors::new();
        check_url(&mut errors, "logo_url", "https://example.com/logo.png");
        assert!(errors.is_empty());

        check_url(&mut errors, "logo_url", "ftp://example.com/logo.png");
        check_url(&mut errors, "photo_url", "not a url");
        assert_eq!(errors.len(), 2);
    }
}
