//! Resolve the real operator behind a `sudo` invocation.

use std::path::PathBuf;

use nix::unistd::{Uid, User, getegid, geteuid, getgid, getuid};

use crate::domain::identity::{OperatorIdentity, operator_user_name};

/// Resolve the operator from `SUDO_USER`/`USER` and the passwd database.
///
/// Root or an unknown user falls back to the process ids and `$HOME`.
#[must_use]
pub fn resolve() -> OperatorIdentity {
    let sudo_user = std::env::var("SUDO_USER").ok();
    let user = std::env::var("USER").ok();
    let name = operator_user_name(sudo_user.as_deref(), user.as_deref());

    if name != "root" {
        match User::from_name(&name) {
            Ok(Some(entry)) => {
                return OperatorIdentity {
                    user: name,
                    home: entry.dir,
                    uid: entry.uid.as_raw(),
                    gid: entry.gid.as_raw(),
                };
            }
            Ok(None) => tracing::debug!(user = %name, "operator not in passwd database"),
            Err(e) => tracing::debug!(user = %name, error = %e, "passwd lookup failed"),
        }
    }

    OperatorIdentity {
        user: name,
        home: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root")),
        uid: getuid().as_raw(),
        gid: getgid().as_raw(),
    }
}

/// True when running with effective uid 0.
#[must_use]
pub fn is_elevated() -> bool {
    geteuid() == Uid::from_raw(0)
}

/// Identity of the current process, ignoring `SUDO_USER`. Used by tests and
/// when the caller wants files owned by whoever runs fleetctl.
#[must_use]
pub fn current_process() -> OperatorIdentity {
    OperatorIdentity {
        user: std::env::var("USER").unwrap_or_default(),
        home: dirs::home_dir().unwrap_or_default(),
        uid: geteuid().as_raw(),
        gid: getegid().as_raw(),
    }
}
