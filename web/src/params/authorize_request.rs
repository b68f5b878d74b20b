use domain::Id;
use serde::Deserialize;

/// Query parameters for looking up a session by id
#[derive(Debug, Deserialize)]
pub(crate) struct SessionQuery {
    pub(crate) session_id: Id,
}

/// Query parameters for resolving a pending device session by user code
#[derive(Debug, Deserialize)]
pub(crate) struct UserCodeQuery {
    pub(crate) user_code: String,
}

/// Body of the consent endpoint: one unified approve/deny flag
#[derive(Debug, Deserialize)]
pub(crate) struct ConsentParams {
    pub(crate) session_id: Id,
    pub(crate) approve: bool,
}
