use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS keyrelay")
            .await?;

        // Enum types shared by auth_sessions.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE keyrelay.flow_type AS ENUM ('auth_code', 'device_code')",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE keyrelay.session_status AS ENUM \
                 ('pending', 'authorized', 'denied', 'consumed', 'expired')",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS keyrelay.session_status")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS keyrelay.flow_type")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS keyrelay")
            .await?;

        Ok(())
    }
}
