use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The central authorization-session table. Which optional columns are
        // populated depends on flow; status transitions are enforced by the
        // conditional updates in entity_api, not by constraints here.
        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS keyrelay.auth_sessions (
                id UUID PRIMARY KEY,
                application_id UUID NOT NULL REFERENCES keyrelay.applications(id) ON DELETE CASCADE,
                flow keyrelay.flow_type NOT NULL,
                status keyrelay.session_status NOT NULL DEFAULT 'pending',
                user_id UUID,

                redirect_uri TEXT,
                code_challenge VARCHAR(128),
                code_challenge_method VARCHAR(16),
                authorization_code VARCHAR(64),
                state TEXT,

                device_code VARCHAR(64),
                user_code VARCHAR(16),
                poll_interval_secs INTEGER,
                last_polled_at TIMESTAMPTZ,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        // Single-use codes are looked up directly; both must be unique.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_auth_sessions_authorization_code
                 ON keyrelay.auth_sessions(authorization_code)
                 WHERE authorization_code IS NOT NULL",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_auth_sessions_device_code
                 ON keyrelay.auth_sessions(device_code)
                 WHERE device_code IS NOT NULL",
            )
            .await?;

        // User codes only have to be unique among pending sessions; settled
        // sessions release their code for reuse.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_auth_sessions_pending_user_code
                 ON keyrelay.auth_sessions(user_code)
                 WHERE user_code IS NOT NULL AND status = 'pending'",
            )
            .await?;

        // The expiry sweep scans by deadline.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_auth_sessions_expires_at
                 ON keyrelay.auth_sessions(expires_at)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS keyrelay.auth_sessions")
            .await?;

        Ok(())
    }
}
