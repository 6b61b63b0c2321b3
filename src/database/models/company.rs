use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use crate::database::bind::query_as_statement;
use crate::database::{sql_for_partial_update, DatabaseError};
use crate::error::{ApiError, ApiResult};
use crate::validation::{
    check_handle, check_not_blank, check_url, push_field, push_patch, FieldErrors, Patch, PayloadRules, UpdateFields,
    Validate,
};

const NOT_FOUND: &str = "Company does not exist";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub num_employees: Option<i32>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CompanySummary {
    pub handle: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCompany {
    pub handle: String,
    pub name: String,
    pub num_employees: Option<i32>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

impl Validate for NewCompany {
    fn validate(&self, errors: &mut FieldErrors) {
        check_handle(errors, "handle", &self.handle);
        check_not_blank(errors, "name", &self.name);
        check_employees(errors, self.num_employees);
        if let Some(url) = &self.logo_url {
            check_url(errors, "logo_url", url);
        }
    }
}

/// PATCH body. The handle is the lookup key and cannot be changed; the
/// nullable columns can be cleared with `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    #[serde(default)]
    pub num_employees: Patch<i32>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub logo_url: Patch<String>,
}

impl Validate for CompanyUpdate {
    fn validate(&self, errors: &mut FieldErrors) {
        if let Some(name) = &self.name {
            check_not_blank(errors, "name", name);
        }
        check_employees(errors, self.num_employees.as_set().copied());
        if let Some(url) = self.logo_url.as_set() {
            check_url(errors, "logo_url", url);
        }
    }
}

impl UpdateFields for CompanyUpdate {
    fn into_fields(self, _rules: &PayloadRules) -> ApiResult<Vec<(&'static str, Value)>> {
        let mut fields = Vec::new();
        push_field(&mut fields, "name", self.name);
        push_patch(&mut fields, "num_employees", self.num_employees);
        push_patch(&mut fields, "description", self.description);
        push_patch(&mut fields, "logo_url", self.logo_url);
        Ok(fields)
    }
}

/// Query string for `GET /companies`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanySearch {
    pub search: Option<String>,
    pub min_employees: Option<i32>,
    pub max_employees: Option<i32>,
}

impl CompanySearch {
    /// Resolve defaults, rejecting an inverted range.
    fn bounds(&self) -> ApiResult<(String, i32, i32)> {
        let min = self.min_employees.unwrap_or(0);
        let max = self.max_employees.unwrap_or(i32::MAX);

        if min > max {
            return Err(ApiError::bad_request(
                "Minimum employees cannot be greater than maximum employees",
            ));
        }

        Ok((format!("%{}%", self.search.as_deref().unwrap_or("")), min, max))
    }
}

fn check_employees(errors: &mut FieldErrors, num_employees: Option<i32>) {
    if matches!(num_employees, Some(n) if n < 0) {
        errors.insert("num_employees".to_string(), "Must be 0 or greater".to_string());
    }
}

impl Company {
    pub async fn create(pool: &PgPool, new: &NewCompany) -> ApiResult<Company> {
        sqlx::query_as::<_, Company>(
            "INSERT INTO companies (handle, name, num_employees, description, logo_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING handle, name, num_employees, description, logo_url",
        )
        .bind(&new.handle)
        .bind(&new.name)
        .bind(new.num_employees)
        .bind(&new.description)
        .bind(&new.logo_url)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to create company '{}': {}", new.handle, e);
            ApiError::bad_request("Could not add new company")
        })
    }

    pub async fn list(pool: &PgPool, search: &CompanySearch) -> ApiResult<Vec<CompanySummary>> {
        let (pattern, min, max) = search.bounds()?;

        let companies = sqlx::query_as::<_, CompanySummary>(
            "SELECT handle, name
             FROM companies
             WHERE name ILIKE $1
             AND num_employees >= $2
             AND num_employees <= $3
             ORDER BY name",
        )
        .bind(pattern)
        .bind(min)
        .bind(max)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(companies)
    }

    pub async fn get(pool: &PgPool, handle: &str) -> ApiResult<Company> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT handle, name, num_employees, description, logo_url
             FROM companies WHERE handle = $1",
        )
        .bind(handle)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from)?;

        company.ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn update(pool: &PgPool, handle: &str, fields: Vec<(&'static str, Value)>) -> ApiResult<Company> {
        Company::get(pool, handle).await?;

        let statement = sql_for_partial_update("companies", fields, "handle", handle)?;
        let company = query_as_statement::<Company>(&statement)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to update company '{}': {}", handle, e);
                ApiError::bad_request("Invalid input")
            })?;

        company.ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn delete(pool: &PgPool, handle: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM companies WHERE handle = $1")
            .bind(handle)
            .execute(pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: PayloadRules = PayloadRules { password_min_length: 5, bcrypt_cost: 4 };

    #[test]
    fn search_defaults_cover_everything() {
        let (pattern, min, max) = CompanySearch::default().bounds().unwrap();
        assert_eq!(pattern, "%%");
        assert_eq!((min, max), (0, 2147483647));
    }

    #[test]
    fn inverted_employee_range_is_rejected() {
        let search = CompanySearch { min_employees: Some(10), max_employees: Some(5), ..Default::default() };
        let err = search.bounds().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Minimum employees cannot be greater than maximum employees");
    }

    #[test]
    fn update_fields_follow_column_order() {
        let update = CompanyUpdate {
            logo_url: Patch::Set("https://apple.com/logo.png".into()),
            name: Some("Apple".into()),
            ..Default::default()
        };
        assert_eq!(
            update.into_fields(&RULES).unwrap(),
            vec![("name", json!("Apple")), ("logo_url", json!("https://apple.com/logo.png"))]
        );
    }

    #[test]
    fn nullable_columns_can_be_cleared() {
        let update: CompanyUpdate =
            serde_json::from_value(json!({"num_employees": null, "logo_url": null})).unwrap();
        assert_eq!(update.description, Patch::Keep);
        assert_eq!(
            update.into_fields(&RULES).unwrap(),
            vec![("num_employees", Value::Null), ("logo_url", Value::Null)]
        );
    }

    #[test]
    fn null_name_is_not_a_change() {
        let update: CompanyUpdate = serde_json::from_value(json!({"name": null})).unwrap();
        assert!(update.into_fields(&RULES).unwrap().is_empty());
    }

    #[test]
    fn new_company_validation() {
        let company = NewCompany {
            handle: "bad handle".into(),
            name: " ".into(),
            num_employees: Some(-1),
            description: None,
            logo_url: Some("logo.png".into()),
        };
        let mut errors = FieldErrors::new();
        company.validate(&mut errors);

        let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["handle", "logo_url", "name", "num_employees"]);
    }
}
