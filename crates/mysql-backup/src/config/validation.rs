//! Configuration validation.

use super::Config;
use crate::core::identifier::validate_identifier;
use crate::error::{BackupError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.connection.host.is_empty() {
        return Err(BackupError::Config("connection.host is required".into()));
    }
    if config.connection.database.is_empty() {
        return Err(BackupError::Config(
            "connection.database is required".into(),
        ));
    }
    if config.connection.user.is_empty() {
        return Err(BackupError::Config("connection.user is required".into()));
    }
    validate_identifier(&config.connection.database)?;

    if config.backup.batch_size == 0 {
        return Err(BackupError::Config(
            "backup.batch_size must be at least 1".into(),
        ));
    }
    if config.backup.charset.is_empty() || config.backup.collation.is_empty() {
        return Err(BackupError::Config(
            "backup.charset and backup.collation cannot be empty".into(),
        ));
    }

    Ok(())
}
