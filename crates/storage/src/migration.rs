// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context schema migration.
//!
//! Migrations transform context JSON from one schema version to the next;
//! the registry chains them to reach the current version. Loading fills
//! defaults for newly introduced fields; unknown higher versions fail
//! loudly rather than silently dropping data.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during migration
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration v{from}→v{to} failed: {reason}")]
    Failed { from: u32, to: u32, reason: String },
    #[error("no migration path from v{0} to v{1}")]
    NoPath(u32, u32),
}

/// A migration from one context schema version to the next.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn migrate(&self, context: &mut Value) -> Result<(), MigrationError>;
}

/// Registry of migrations for upgrading context files.
pub struct MigrationRegistry {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Create a registry with all known migrations.
    ///
    /// Schema v1 is current; the list grows as the schema evolves.
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// Migrate a context document to the target version.
    ///
    /// The caller has already rejected versions above the target.
    pub fn migrate_to(&self, mut context: Value, target: u32) -> Result<Value, MigrationError> {
        let current = context
            .get("schema_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as u32;

        if current >= target {
            return Ok(context);
        }

        let mut version = current;
        while version < target {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.source_version() == version)
                .ok_or(MigrationError::NoPath(version, target))?;

            migration.migrate(&mut context)?;
            version = migration.target_version();

            if let Some(obj) = context.as_object_mut() {
                obj.insert("schema_version".into(), version.into());
            }
        }
        Ok(context)
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
