use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A registered client application that may request SSO authorization
/// sessions. Redirect targets live in `trusted_redirect_uris`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[sea_orm(schema_name = "keyrelay", table_name = "applications")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub name: String,
    pub logo_url: Option<String>,
    /// SHA-256 hex digest of the server-to-server API key. The raw key is
    /// shown once at creation and never stored.
    #[serde(skip_serializing)]
    pub api_key_hash: Option<String>,
    pub device_code_enabled: bool,
    /// Suspension window; the app is refused while this is in the future.
    #[schema(value_type = Option<String>, format = DateTime)]
    pub suspended_until: Option<DateTimeWithTimeZone>,
    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::auth_sessions::Entity")]
    AuthSessions,
    #[sea_orm(has_many = "super::trusted_redirect_uris::Entity")]
    TrustedRedirectUris,
}

impl Related<super::auth_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthSessions.def()
    }
}

impl Related<super::trusted_redirect_uris::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrustedRedirectUris.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
