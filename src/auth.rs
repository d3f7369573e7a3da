use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

/// Shared-secret check standing in for the member OTP and the admin password.
#[derive(Debug, Clone)]
pub struct SharedSecretGate {
    member_secret: String,
    admin_secret: String,
}

impl SharedSecretGate {
    pub fn new(member_secret: impl Into<String>, admin_secret: impl Into<String>) -> Self {
        Self {
            member_secret: member_secret.into(),
            admin_secret: admin_secret.into(),
        }
    }

    /// Admin wins when both secrets are equal.
    pub fn verify(&self, secret: &str) -> Option<Role> {
        let secret = secret.trim();
        let role = if !self.admin_secret.is_empty() && secret == self.admin_secret {
            Some(Role::Admin)
        } else if !self.member_secret.is_empty() && secret == self.member_secret {
            Some(Role::Member)
        } else {
            None
        };
        if role.is_none() {
            warn!("secret rejected");
            metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
        }
        role
    }

    pub fn verify_member(&self, secret: &str) -> bool {
        self.verify(secret) == Some(Role::Member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles() {
        let gate = SharedSecretGate::new("123", "admin123");
        assert_eq!(gate.verify("123"), Some(Role::Member));
        assert_eq!(gate.verify(" admin123\n"), Some(Role::Admin));
        assert_eq!(gate.verify("1234"), None);
        assert!(gate.verify_member("123"));
        assert!(!gate.verify_member("admin123"));
    }

    #[test]
    fn empty_secret_never_matches() {
        let gate = SharedSecretGate::new("", "");
        assert_eq!(gate.verify(""), None);
    }
}
