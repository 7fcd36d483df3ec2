//! The real operator behind a possibly elevated invocation.

use std::path::PathBuf;

/// Who owns the files fleetctl creates: the user who ran `sudo`, not root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorIdentity {
    pub user: String,
    pub home: PathBuf,
    pub uid: u32,
    pub gid: u32,
}

/// Pick the operator's user name from `SUDO_USER` / `USER`.
///
/// Empty values are ignored; the result is `root` when neither is set.
#[must_use]
pub fn operator_user_name(sudo_user: Option<&str>, user: Option<&str>) -> String {
    sudo_user
        .filter(|s| !s.is_empty())
        .or(user.filter(|s| !s.is_empty()))
        .unwrap_or("root")
        .to_string()
}
