use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Registered client applications. The raw API key is never stored,
        // only its SHA-256 hex digest.
        let create_applications_sql = r#"
            CREATE TABLE IF NOT EXISTS keyrelay.applications (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(255) NOT NULL,
                logo_url TEXT,

                api_key_hash VARCHAR(64),
                device_code_enabled BOOLEAN NOT NULL DEFAULT TRUE,
                suspended_until TIMESTAMPTZ,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_applications_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_api_key_hash
                 ON keyrelay.applications(api_key_hash)
                 WHERE api_key_hash IS NOT NULL",
            )
            .await?;

        // Redirect allow-list: exact-match membership only.
        let create_trusted_uris_sql = r#"
            CREATE TABLE IF NOT EXISTS keyrelay.trusted_redirect_uris (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                application_id UUID NOT NULL REFERENCES keyrelay.applications(id) ON DELETE CASCADE,
                uri TEXT NOT NULL,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                UNIQUE(application_id, uri)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_trusted_uris_sql)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS keyrelay.trusted_redirect_uris")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS keyrelay.applications")
            .await?;

        Ok(())
    }
}
