//! Stored passwords are bcrypt hashes (`$2b$<cost>$...`).

use bcrypt::BcryptError;

pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(password, cost)
}

/// Errors only when `hash` is not a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("password", COST).unwrap();
        assert!(stored.starts_with("$2"));
        assert!(verify_password("password", &stored).unwrap());
        assert!(!verify_password("bad password", &stored).unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        assert_ne!(hash_password("password", COST).unwrap(), hash_password("password", COST).unwrap());
    }

    #[test]
    fn cost_is_recorded_in_hash() {
        let stored = hash_password("password", 5).unwrap();
        assert!(stored.contains("$05$"));
    }

    #[test]
    fn plain_digest_is_not_a_stored_hash() {
        assert!(verify_password("password", "password").is_err());
        assert!(verify_password("password", "sha256$abc$def").is_err());
    }

    #[test]
    fn cost_out_of_range_is_rejected() {
        assert!(hash_password("password", 3).is_err());
    }
}
