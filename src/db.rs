use anyhow::{Context, Result};
use sqlx::MySqlPool;
use tracing::info;

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")
}

pub async fn run_migrations(pool: &MySqlPool) -> Result<()> {
    info!("Running database migrations...");

    create_attendance_table(pool).await?;

    info!("Database migrations completed successfully");
    Ok(())
}

async fn create_attendance_table(pool: &MySqlPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            employee_id BIGINT UNSIGNED NOT NULL,
            date DATE NOT NULL,
            punch_in_time DATETIME(3) NOT NULL,
            punch_in_plant_id BIGINT UNSIGNED NOT NULL,
            punch_in_latitude DOUBLE NULL,
            punch_in_longitude DOUBLE NULL,
            punch_out_time DATETIME(3) NULL,
            punch_out_plant_id BIGINT UNSIGNED NULL,
            punch_out_latitude DOUBLE NULL,
            punch_out_longitude DOUBLE NULL,
            total_hours DOUBLE NOT NULL DEFAULT 0,
            status VARCHAR(16) NOT NULL DEFAULT 'present',
            notes VARCHAR(500) NULL,
            is_edited BOOLEAN NOT NULL DEFAULT FALSE,
            edit_history JSON NOT NULL,
            created_at DATETIME(3) NOT NULL,
            updated_at DATETIME(3) NOT NULL,
            UNIQUE KEY uq_attendance_employee_date (employee_id, date),
            KEY idx_attendance_date (date)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create attendance table")?;

    Ok(())
}
