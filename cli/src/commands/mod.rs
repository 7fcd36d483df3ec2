//! Command implementations: one module per operator command.

pub mod backup;
pub mod container_status;
pub mod contexts;
pub mod delete_backup;
pub mod exec;
pub mod lifecycle;
pub mod list_backups;
pub mod projects;
pub mod restore;
pub mod set_secret;
pub mod status;
pub mod verify_secrets;
