pub mod auth;

pub use auth::{
    ensure_admin, ensure_correct_user, ensure_logged_in, identity_from_token, require_authenticated,
    require_elevated, require_same_subject, verify_identity, Authentication,
};
