use crate::flow_type::FlowType;
use crate::session_status::SessionStatus;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An in-flight authorization session: the single source of truth shared by
/// the consent UI, the polling client and the token endpoint.
///
/// Which optional columns are populated is determined by `flow`:
/// auth-code sessions carry `redirect_uri`/`code_challenge`/`state` and,
/// once approved, `authorization_code`; device-code sessions carry
/// `device_code`/`user_code`/`poll_interval_secs`/`last_polled_at`.
/// Cross-flow fields are never both present.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[sea_orm(schema_name = "keyrelay", table_name = "auth_sessions")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key, auto_increment = false)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    #[schema(value_type = String, format = Uuid)]
    pub application_id: Id,
    pub flow: FlowType,
    pub status: SessionStatus,
    /// Set the moment an authenticated user records a decision.
    #[schema(value_type = Option<String>, format = Uuid)]
    pub user_id: Option<Id>,

    // Authorization-code flow
    pub redirect_uri: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    #[serde(skip_serializing)]
    pub authorization_code: Option<String>,
    pub state: Option<String>,

    // Device-code flow
    #[serde(skip_serializing)]
    pub device_code: Option<String>,
    pub user_code: Option<String>,
    pub poll_interval_secs: Option<i32>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_polled_at: Option<DateTimeWithTimeZone>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::applications::Entity",
        from = "Column::ApplicationId",
        to = "super::applications::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Applications,
}

impl Related<super::applications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
