pub use super::applications::Entity as Applications;
pub use super::auth_sessions::Entity as AuthSessions;
pub use super::trusted_redirect_uris::Entity as TrustedRedirectUris;
