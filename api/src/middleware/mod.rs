//! Request middleware: authentication, tenant context, role checks

pub mod auth;
pub mod roles;
pub mod tenant;

pub use auth::{require_auth, AuthUser};
pub use roles::{require, Permission};
pub use tenant::tenant_context;
