use super::error::{EntityApiErrorKind, Error};
use crate::uuid_parse_str;
use entity::applications::{ActiveModel, Column, Entity, Model};
use entity::trusted_redirect_uris;
use entity::Id;
use log::debug;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DatabaseConnection};

/// Registers a new application record
pub async fn create(db: &DatabaseConnection, model: Model) -> Result<Model, Error> {
    debug!("Creating application record: {}", model.name);

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        id: Set(model.id),
        name: Set(model.name),
        logo_url: Set(model.logo_url),
        api_key_hash: Set(model.api_key_hash),
        device_code_enabled: Set(model.device_code_enabled),
        suspended_until: Set(model.suspended_until),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?)
}

/// Finds an application by its client id
pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Finds an application by a client id supplied as a raw request string.
/// An unparseable id is reported as `InvalidQueryTerm` rather than a lookup miss.
pub async fn find_by_client_id_str(
    db: &DatabaseConnection,
    client_id: &str,
) -> Result<Option<Model>, Error> {
    let id = uuid_parse_str(client_id)?;
    find_by_id(db, id).await
}

/// Finds an application by the SHA-256 hex digest of its API key
pub async fn find_by_api_key_hash(
    db: &DatabaseConnection,
    api_key_hash: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::ApiKeyHash.eq(api_key_hash))
        .one(db)
        .await?)
}

/// Checks exact-match membership of `uri` in the application's registered
/// redirect allow-list. No normalization, no wildcard matching.
pub async fn is_trusted_redirect_uri(
    db: &DatabaseConnection,
    application_id: Id,
    uri: &str,
) -> Result<bool, Error> {
    let found = trusted_redirect_uris::Entity::find()
        .filter(trusted_redirect_uris::Column::ApplicationId.eq(application_id))
        .filter(trusted_redirect_uris::Column::Uri.eq(uri))
        .one(db)
        .await?;
    Ok(found.is_some())
}

/// Registers a trusted redirect URI for an application
pub async fn add_trusted_redirect_uri(
    db: &DatabaseConnection,
    application_id: Id,
    uri: String,
) -> Result<trusted_redirect_uris::Model, Error> {
    let existing = find_by_id(db, application_id).await?;
    if existing.is_none() {
        return Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        });
    }

    let active_model = trusted_redirect_uris::ActiveModel {
        id: Set(Id::new_v4()),
        application_id: Set(application_id),
        uri: Set(uri),
        created_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.insert(db).await?)
}
