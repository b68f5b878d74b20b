use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The grant flow an authorization session was created for. Fixed at
/// creation; determines which optional columns are populated.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "flow_type")]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    #[sea_orm(string_value = "auth_code")]
    AuthCode,
    #[sea_orm(string_value = "device_code")]
    DeviceCode,
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthCode => write!(f, "auth_code"),
            Self::DeviceCode => write!(f, "device_code"),
        }
    }
}
