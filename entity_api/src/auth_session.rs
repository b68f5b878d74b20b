use super::error::Error;
use entity::auth_sessions::{ActiveModel, Column, Entity, Model};
use entity::flow_type::FlowType;
use entity::session_status::SessionStatus;
use entity::Id;
use log::debug;
use sea_orm::{
    entity::prelude::*, sea_query::Expr, ActiveValue::Set, DatabaseConnection,
};

/// Inserts a new authorization session row
pub async fn create(db: &DatabaseConnection, model: Model) -> Result<Model, Error> {
    debug!(
        "Creating {} authorization session for application {}",
        model.flow, model.application_id
    );

    let active_model = ActiveModel {
        id: Set(model.id),
        application_id: Set(model.application_id),
        flow: Set(model.flow),
        status: Set(model.status),
        user_id: Set(model.user_id),
        redirect_uri: Set(model.redirect_uri),
        code_challenge: Set(model.code_challenge),
        code_challenge_method: Set(model.code_challenge_method),
        authorization_code: Set(model.authorization_code),
        state: Set(model.state),
        device_code: Set(model.device_code),
        user_code: Set(model.user_code),
        poll_interval_secs: Set(model.poll_interval_secs),
        last_polled_at: Set(model.last_polled_at),
        created_at: Set(model.created_at),
        expires_at: Set(model.expires_at),
    };

    Ok(active_model.insert(db).await?)
}

/// Finds a session by its id
pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Finds an auth-code session by its minted authorization code
pub async fn find_by_authorization_code(
    db: &DatabaseConnection,
    code: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::AuthorizationCode.eq(code))
        .one(db)
        .await?)
}

/// Finds a device-code session by its device code
pub async fn find_by_device_code(
    db: &DatabaseConnection,
    device_code: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::DeviceCode.eq(device_code))
        .one(db)
        .await?)
}

/// Finds a *pending* device-code session by its human-typed user code.
/// Sessions that have left `pending` are deliberately not discoverable this
/// way, so a user code stops resolving the moment a decision lands.
pub async fn find_pending_by_user_code(
    db: &DatabaseConnection,
    user_code: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Flow.eq(FlowType::DeviceCode))
        .filter(Column::UserCode.eq(user_code))
        .filter(Column::Status.eq(SessionStatus::Pending))
        .one(db)
        .await?)
}

/// Whether `user_code` is already claimed by a pending device session.
/// Uniqueness only matters among pending sessions; codes on settled sessions
/// are free for reuse.
pub async fn user_code_in_use(db: &DatabaseConnection, user_code: &str) -> Result<bool, Error> {
    Ok(find_pending_by_user_code(db, user_code).await?.is_some())
}

/// Records the user's consent decision, but only if the session is still
/// `pending`. The status filter makes the read-modify-write race-free: of two
/// concurrent decisions, exactly one observes `rows_affected == 1`.
///
/// `authorization_code` is minted by the caller at decision time for
/// auth-code sessions and written in the same statement as the status flip,
/// so no reader can observe a code on a still-pending session.
pub async fn decide_if_pending(
    db: &DatabaseConnection,
    id: Id,
    status: SessionStatus,
    user_id: Id,
    authorization_code: Option<String>,
) -> Result<u64, Error> {
    debug!("Recording decision {} on session {}", status, id);

    let mut update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(status))
        .col_expr(Column::UserId, Expr::value(Some(user_id)));

    if let Some(code) = authorization_code {
        update = update.col_expr(Column::AuthorizationCode, Expr::value(Some(code)));
    }

    let result = update
        .filter(Column::Id.eq(id))
        .filter(Column::Status.eq(SessionStatus::Pending))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Transitions `authorized -> consumed`, the only path into `consumed`.
/// The conditional update is the serialization point for redemption: under
/// concurrent redeem attempts exactly one caller wins (`rows_affected == 1`)
/// and every other caller observes the already-consumed row.
pub async fn consume_if_authorized(db: &DatabaseConnection, id: Id) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::Status, Expr::value(SessionStatus::Consumed))
        .filter(Column::Id.eq(id))
        .filter(Column::Status.eq(SessionStatus::Authorized))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Marks a single overdue session `expired`. Consumed and denied rows keep
/// their terminal status on the read path; the sweep handles denied rows.
pub async fn mark_expired(db: &DatabaseConnection, id: Id) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::Status, Expr::value(SessionStatus::Expired))
        .filter(Column::Id.eq(id))
        .filter(
            Column::Status
                .eq(SessionStatus::Pending)
                .or(Column::Status.eq(SessionStatus::Authorized)),
        )
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Stamps `last_polled_at` for device-code slow-down enforcement
pub async fn record_poll(
    db: &DatabaseConnection,
    id: Id,
    polled_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), Error> {
    Entity::update_many()
        .col_expr(
            Column::LastPolledAt,
            Expr::value(Some(DateTimeWithTimeZone::from(polled_at))),
        )
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;

    Ok(())
}

/// Sweeps every overdue non-consumed session to `expired` in one statement.
/// `pending|authorized|denied -> expired` are all legal, idempotent
/// transitions, so the sweep is safe to run concurrently with request
/// handling.
pub async fn expire_overdue(
    db: &DatabaseConnection,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::Status, Expr::value(SessionStatus::Expired))
        .filter(Column::ExpiresAt.lt(DateTimeWithTimeZone::from(now)))
        .filter(Column::Status.is_in([
            SessionStatus::Pending,
            SessionStatus::Authorized,
            SessionStatus::Denied,
        ]))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Deletes expired tombstones whose deadline passed before `cutoff`
pub async fn delete_expired_before(
    db: &DatabaseConnection,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(Column::Status.eq(SessionStatus::Expired))
        .filter(Column::ExpiresAt.lt(DateTimeWithTimeZone::from(cutoff)))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_model(flow: FlowType) -> Model {
        let now = chrono::Utc::now();
        let mut model = Model {
            id: Id::new_v4(),
            application_id: Id::new_v4(),
            flow,
            status: SessionStatus::Pending,
            user_id: None,
            redirect_uri: None,
            code_challenge: None,
            code_challenge_method: None,
            authorization_code: None,
            state: None,
            device_code: None,
            user_code: None,
            poll_interval_secs: None,
            last_polled_at: None,
            created_at: now.into(),
            expires_at: (now + chrono::Duration::minutes(10)).into(),
        };
        match flow {
            FlowType::AuthCode => {
                model.redirect_uri = Some("https://app.example/cb".to_string());
                model.code_challenge = Some("challenge".to_string());
                model.code_challenge_method = Some("S256".to_string());
            }
            FlowType::DeviceCode => {
                model.device_code = Some("device-code".to_string());
                model.user_code = Some("ABCD2345".to_string());
                model.poll_interval_secs = Some(5);
            }
        }
        model
    }

    #[tokio::test]
    async fn create_returns_the_inserted_session() -> Result<(), Error> {
        let model = test_model(FlowType::AuthCode);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let result = create(&db, model.clone()).await?;

        assert_eq!(result.id, model.id);
        assert_eq!(result.status, SessionStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn find_by_authorization_code_returns_none_when_not_found() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results::<Model, Vec<Model>, _>(vec![vec![]])
            .into_connection();

        let result = find_by_authorization_code(&db, "no-such-code").await?;
        assert!(result.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn find_pending_by_user_code_returns_pending_session() -> Result<(), Error> {
        let model = test_model(FlowType::DeviceCode);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let result = find_pending_by_user_code(&db, "ABCD2345").await?;
        assert_eq!(result.unwrap().id, model.id);
        Ok(())
    }

    #[tokio::test]
    async fn decide_if_pending_reports_one_row_when_session_was_pending() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let rows = decide_if_pending(
            &db,
            Id::new_v4(),
            SessionStatus::Authorized,
            Id::new_v4(),
            Some("minted-code".to_string()),
        )
        .await?;

        assert_eq!(rows, 1);
        Ok(())
    }

    #[tokio::test]
    async fn decide_if_pending_reports_zero_rows_when_already_decided() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let rows = decide_if_pending(
            &db,
            Id::new_v4(),
            SessionStatus::Denied,
            Id::new_v4(),
            None,
        )
        .await?;

        assert_eq!(rows, 0);
        Ok(())
    }

    #[tokio::test]
    async fn consume_if_authorized_single_winner_under_retry() -> Result<(), Error> {
        // Two sequential attempts against the same session: the first flips
        // authorized -> consumed, the second finds no matching row.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let id = Id::new_v4();
        assert_eq!(consume_if_authorized(&db, id).await?, 1);
        assert_eq!(consume_if_authorized(&db, id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn expire_overdue_reports_swept_row_count() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();

        let rows = expire_overdue(&db, chrono::Utc::now()).await?;
        assert_eq!(rows, 3);
        Ok(())
    }

    #[tokio::test]
    async fn delete_expired_before_reports_deleted_row_count() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .into_connection();

        let rows = delete_expired_before(&db, chrono::Utc::now()).await?;
        assert_eq!(rows, 2);
        Ok(())
    }
}
