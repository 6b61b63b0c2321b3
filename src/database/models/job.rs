use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use crate::database::bind::query_as_statement;
use crate::database::{sql_for_partial_update, DatabaseError};
use crate::error::{ApiError, ApiResult};
use crate::validation::{check_handle, check_not_blank, push_field, FieldErrors, PayloadRules, UpdateFields, Validate};

const NOT_FOUND: &str = "Job does not exist";
const BAD_RANGE: &str = "Please enter salary greater than 0 and equity between 0 and 1";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: i32,
    pub equity: f64,
    pub company_handle: String,
    pub date_posted: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobSummary {
    pub title: String,
    pub company_handle: String,
}

/// A job together with the company offering it
#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub company: JobCompany,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobCompany {
    pub name: String,
    pub num_employees: Option<i32>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(FromRow)]
struct JobDetailRow {
    #[sqlx(flatten)]
    job: Job,
    name: String,
    num_employees: Option<i32>,
    description: Option<String>,
    logo_url: Option<String>,
}

impl From<JobDetailRow> for JobDetail {
    fn from(row: JobDetailRow) -> Self {
        Self {
            job: row.job,
            company: JobCompany {
                name: row.name,
                num_employees: row.num_employees,
                description: row.description,
                logo_url: row.logo_url,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    pub salary: i32,
    pub equity: f64,
    pub company_handle: String,
}

impl Validate for NewJob {
    fn validate(&self, errors: &mut FieldErrors) {
        check_not_blank(errors, "title", &self.title);
        check_salary(errors, Some(self.salary));
        check_equity(errors, Some(self.equity));
        check_handle(errors, "company_handle", &self.company_handle);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub salary: Option<i32>,
    pub equity: Option<f64>,
    pub company_handle: Option<String>,
}

impl Validate for JobUpdate {
    fn validate(&self, errors: &mut FieldErrors) {
        if let Some(title) = &self.title {
            check_not_blank(errors, "title", title);
        }
        check_salary(errors, self.salary);
        check_equity(errors, self.equity);
        if let Some(handle) = &self.company_handle {
            check_handle(errors, "company_handle", handle);
        }
    }
}

impl UpdateFields for JobUpdate {
    fn into_fields(self, _rules: &PayloadRules) -> ApiResult<Vec<(&'static str, Value)>> {
        let mut fields = Vec::new();
        push_field(&mut fields, "title", self.title);
        push_field(&mut fields, "salary", self.salary);
        push_field(&mut fields, "equity", self.equity);
        push_field(&mut fields, "company_handle", self.company_handle);
        Ok(fields)
    }
}

/// Query string for `GET /jobs`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSearch {
    pub search: Option<String>,
    pub min_salary: Option<i32>,
    pub min_equity: Option<f64>,
}

impl JobSearch {
    fn bounds(&self) -> ApiResult<(String, i32, f64)> {
        let min_salary = self.min_salary.unwrap_or(0);
        let min_equity = self.min_equity.unwrap_or(0.0);

        if min_salary < 0 || !(0.0..=1.0).contains(&min_equity) {
            return Err(ApiError::bad_request(BAD_RANGE));
        }

        Ok((format!("%{}%", self.search.as_deref().unwrap_or("")), min_salary, min_equity))
    }
}

fn check_salary(errors: &mut FieldErrors, salary: Option<i32>) {
    if matches!(salary, Some(s) if s < 0) {
        errors.insert("salary".to_string(), "Must be 0 or greater".to_string());
    }
}

fn check_equity(errors: &mut FieldErrors, equity: Option<f64>) {
    if matches!(equity, Some(e) if !(0.0..=1.0).contains(&e)) {
        errors.insert("equity".to_string(), "Must be between 0 and 1".to_string());
    }
}

impl Job {
    pub async fn create(pool: &PgPool, new: &NewJob) -> ApiResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (title, salary, equity, company_handle)
             VALUES ($1, $2, $3, $4)
             RETURNING id, title, salary, equity, company_handle, date_posted",
        )
        .bind(&new.title)
        .bind(new.salary)
        .bind(new.equity)
        .bind(&new.company_handle)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to create job '{}': {}", new.title, e);
            ApiError::bad_request("Could not add new job")
        })
    }

    pub async fn list(pool: &PgPool, search: &JobSearch) -> ApiResult<Vec<JobSummary>> {
        let (pattern, min_salary, min_equity) = search.bounds()?;

        let jobs = sqlx::query_as::<_, JobSummary>(
            "SELECT title, company_handle
             FROM jobs
             WHERE title ILIKE $1
             AND salary >= $2
             AND equity >= $3
             ORDER BY date_posted DESC",
        )
        .bind(pattern)
        .bind(min_salary)
        .bind(min_equity)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(jobs)
    }

    pub async fn get(pool: &PgPool, id: i32) -> ApiResult<JobDetail> {
        let row = sqlx::query_as::<_, JobDetailRow>(
            "SELECT j.id, j.title, j.salary, j.equity, j.company_handle, j.date_posted,
                    c.name, c.num_employees, c.description, c.logo_url
             FROM jobs j
             JOIN companies c ON j.company_handle = c.handle
             WHERE j.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from)?;

        row.map(JobDetail::from).ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn update(pool: &PgPool, id: i32, fields: Vec<(&'static str, Value)>) -> ApiResult<Job> {
        Job::get(pool, id).await?;

        let statement = sql_for_partial_update("jobs", fields, "id", id)?;
        let job = query_as_statement::<Job>(&statement)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to update job {}: {}", id, e);
                ApiError::bad_request("Invalid input")
            })?;

        job.ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn delete(pool: &PgPool, id: i32) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        Ok(())
    }
}
