//! Dashboard account names: a host login, optionally qualified with `@realm`.

use crate::core::domain::error::ValidationError;

/// Longest login name most hosts accept for the local part.
const MAX_LOCAL_LEN: usize = 32;

/// Accounts that own the hypervisor itself rather than a dashboard user.
const SYSTEM_ACCOUNTS: [&str; 4] = ["root", "qemu", "libvirt-qemu", "nobody"];

/// A dashboard account name such as `ops` or `ops@ldap`.
#[derive(Debug, Clone)]
pub struct VirtUsername(String);

impl VirtUsername {
    pub(crate) fn new_unchecked(username: String) -> Self {
        Self(username)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before `@`, which is the host login.
    pub fn login(&self) -> &str {
        split(&self.0).0
    }

    /// The authentication realm after `@`, if any.
    pub fn realm(&self) -> Option<&str> {
        split(&self.0).1
    }
}

fn split(username: &str) -> (&str, Option<&str>) {
    match username.split_once('@') {
        Some((login, realm)) => (login, Some(realm)),
        None => (username, None),
    }
}

fn invalid(message: impl Into<String>) -> ValidationError {
    ValidationError::Format(message.into())
}

/// Checks `username` against the host's login rules.
///
/// With `block_system_accounts` the hypervisor's own accounts are refused,
/// whatever realm they come with.
pub(crate) fn validate_username(
    username: &str,
    block_system_accounts: bool,
) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::Field {
            field: "username".to_string(),
            message: "Username cannot be empty".to_string(),
        });
    }
    if username.trim() != username {
        return Err(invalid("Username has leading or trailing whitespace"));
    }

    let (login, realm) = split(username);
    let mut chars = login.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return Err(invalid("Login must start with a letter or '_'")),
    }
    if login.len() > MAX_LOCAL_LEN {
        return Err(invalid(format!(
            "Login cannot exceed {} characters (got {})",
            MAX_LOCAL_LEN,
            login.len()
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        return Err(invalid("Login may only contain letters, digits, '.', '_' and '-'"));
    }

    if let Some(realm) = realm {
        let realm_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-');
        if realm.is_empty() || !realm.chars().all(realm_char) {
            return Err(invalid(format!("Invalid realm '{}'", realm)));
        }
    }

    if block_system_accounts
        && SYSTEM_ACCOUNTS
            .iter()
            .any(|account| account.eq_ignore_ascii_case(login))
    {
        return Err(ValidationError::ConstraintViolation(format!(
            "'{}' is a hypervisor system account",
            login
        )));
    }
    Ok(())
}
