//! Unit tests for fleetctl
//!
//! Services run against scripted engine mocks and a throwaway filesystem
//! layout. Backup and secret tests use a stand-in `age` script, so no real
//! key material is needed.

mod architecture;
mod backup_manager;
mod helpers;
mod secrets_manager;
