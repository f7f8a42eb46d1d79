//! Static credential store
//!
//! Entity-code → password maps for municipal users and schools, plus an
//! optional master password accepted for any code. Everything is supplied by
//! the configuration file or environment; nothing is compiled in.

use std::collections::BTreeMap;
use std::fmt;

/// Login credentials known to the dashboard
#[derive(Clone, Default)]
pub struct CredentialStore {
    users: BTreeMap<String, String>,
    schools: BTreeMap<String, String>,
    master_password: Option<String>,
}

impl CredentialStore {
    pub fn new(
        users: BTreeMap<String, String>,
        schools: BTreeMap<String, String>,
        master_password: Option<String>,
    ) -> Self {
        let master_password = master_password.filter(|p| !p.is_empty());

        Self {
            users,
            schools,
            master_password,
        }
    }

    /// Check a login attempt
    ///
    /// The master password unlocks any non-empty code. Otherwise the code must
    /// be a known user or school and the password must match exactly.
    pub fn verify(&self, code: &str, password: &str) -> bool {
        if code.trim().is_empty() || password.is_empty() {
            return false;
        }

        if self.master_password.as_deref() == Some(password) {
            return true;
        }

        self.password_for(code.trim()) == Some(password)
    }

    /// True if the code belongs to a municipal user
    pub fn is_municipal(&self, code: &str) -> bool {
        self.users.contains_key(code)
    }

    /// Codes listed both as municipal user and as school
    ///
    /// The school entry wins for these codes.
    pub fn conflicting_codes(&self) -> Vec<&str> {
        self.users
            .keys()
            .filter(|code| self.schools.contains_key(*code))
            .map(String::as_str)
            .collect()
    }

    pub fn has_master_password(&self) -> bool {
        self.master_password.is_some()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn school_count(&self) -> usize {
        self.schools.len()
    }

    // Schools are merged over users, so a school entry shadows a user entry.
    fn password_for(&self, code: &str) -> Option<&str> {
        self.schools
            .get(code)
            .or_else(|| self.users.get(code))
            .map(String::as_str)
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("users", &self.users.len())
            .field("schools", &self.schools.len())
            .field("master_password", &self.master_password.is_some())
            .finish()
    }
}
