pub mod company;
pub mod job;
pub mod user;

pub use company::{Company, CompanySearch, CompanySummary, CompanyUpdate, NewCompany};
pub use job::{Job, JobDetail, JobSearch, JobSummary, JobUpdate, NewJob};
pub use user::{LoginRequest, NewUser, User, UserSummary, UserUpdate};
