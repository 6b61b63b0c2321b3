use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::database::bind::query_as_statement;
use crate::database::{sql_for_partial_update, DatabaseError};
use crate::error::{ApiError, ApiResult};
use crate::validation::{
    check_email, check_handle, check_not_blank, check_url, push_field, push_patch, FieldErrors, Patch, PayloadRules,
    UpdateFields, Validate,
};

const NOT_FOUND: &str = "User does not exist";

/// Public view of a user. The password hash and admin flag never leave the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(FromRow)]
struct Credentials {
    password: String,
    is_admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub photo_url: Option<String>,
}

impl Validate for NewUser {
    fn validate(&self, errors: &mut FieldErrors) {
        check_handle(errors, "username", &self.username);
        check_not_blank(errors, "first_name", &self.first_name);
        check_not_blank(errors, "last_name", &self.last_name);
        check_email(errors, "email", &self.email);
        if let Some(url) = &self.photo_url {
            check_url(errors, "photo_url", url);
        }
    }

    fn validate_with(&self, rules: &PayloadRules, errors: &mut FieldErrors) {
        self.validate(errors);
        check_password(errors, &self.password, rules.password_min_length);
    }
}

/// PATCH body. Usernames and admin rights cannot be changed here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Patch<String>,
}

impl Validate for UserUpdate {
    fn validate(&self, errors: &mut FieldErrors) {
        if let Some(first_name) = &self.first_name {
            check_not_blank(errors, "first_name", first_name);
        }
        if let Some(last_name) = &self.last_name {
            check_not_blank(errors, "last_name", last_name);
        }
        if let Some(email) = &self.email {
            check_email(errors, "email", email);
        }
        if let Some(url) = self.photo_url.as_set() {
            check_url(errors, "photo_url", url);
        }
    }

    fn validate_with(&self, rules: &PayloadRules, errors: &mut FieldErrors) {
        self.validate(errors);
        if let Some(password) = &self.password {
            check_password(errors, password, rules.password_min_length);
        }
    }
}

impl UpdateFields for UserUpdate {
    /// A new password is hashed before it becomes a column value.
    fn into_fields(self, rules: &PayloadRules) -> ApiResult<Vec<(&'static str, Value)>> {
        let mut fields = Vec::new();
        if let Some(password) = self.password {
            fields.push(("password", Value::String(hash_password(&password, rules.bcrypt_cost)?)));
        }
        push_field(&mut fields, "first_name", self.first_name);
        push_field(&mut fields, "last_name", self.last_name);
        push_field(&mut fields, "email", self.email);
        push_patch(&mut fields, "photo_url", self.photo_url);
        Ok(fields)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        check_not_blank(errors, "username", &self.username);
        check_not_blank(errors, "password", &self.password);
    }
}

fn check_password(errors: &mut FieldErrors, password: &str, min_length: usize) {
    if password.chars().count() < min_length {
        errors.insert("password".to_string(), format!("Must be at least {} characters", min_length));
    }
}

impl User {
    pub async fn create(pool: &PgPool, new: &NewUser, bcrypt_cost: u32) -> ApiResult<User> {
        let password = hash_password(&new.password, bcrypt_cost)?;

        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password, first_name, last_name, email, photo_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING username, first_name, last_name, email, photo_url",
        )
        .bind(&new.username)
        .bind(password)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.photo_url)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to create user '{}': {}", new.username, e);
            ApiError::bad_request("Could not add new user")
        })
    }

    pub async fn list(pool: &PgPool) -> ApiResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT username, first_name, last_name, email
             FROM users
             ORDER BY username",
        )
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(users)
    }

    pub async fn get(pool: &PgPool, username: &str) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT username, first_name, last_name, email, photo_url
             FROM users
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from)?;

        user.ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn update(pool: &PgPool, username: &str, fields: Vec<(&'static str, Value)>) -> ApiResult<User> {
        User::get(pool, username).await?;

        let statement = sql_for_partial_update("users", fields, "username", username)?;
        let user = query_as_statement::<User>(&statement)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to update user '{}': {}", username, e);
                ApiError::bad_request("Invalid input")
            })?;

        user.ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn delete(pool: &PgPool, username: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        Ok(())
    }

    /// Check a username/password pair. Unknown users and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn authenticate(pool: &PgPool, username: &str, password: &str) -> ApiResult<Option<AuthUser>> {
        let credentials = sqlx::query_as::<_, Credentials>(
            "SELECT password, is_admin
             FROM users
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from)?;

        let Some(credentials) = credentials else {
            return Ok(None);
        };
        if !verify_password(password, &credentials.password)? {
            return Ok(None);
        }

        Ok(Some(AuthUser {
            username: username.to_string(),
            is_admin: credentials.is_admin,
        }))
    }
}
