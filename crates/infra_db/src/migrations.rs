//! Embedded schema migrations

use sqlx::migrate::Migrator;
use tracing::info;

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies every migration the database has not seen yet
pub async fn run_pending(pool: &DatabasePool) -> Result<(), DatabaseError> {
    info!(available = MIGRATOR.iter().count(), "Running database migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_migration_is_embedded() {
        let descriptions: Vec<_> = MIGRATOR.iter().map(|m| m.description.to_string()).collect();
        assert_eq!(descriptions, vec!["expense schema".to_string()]);
    }
}
