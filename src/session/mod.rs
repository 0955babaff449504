//! The authenticated session and the interceptor that keeps it alive.

pub mod interceptor;
pub mod store;

pub use interceptor::{AuthInterceptor, RefreshState};
pub use store::{Session, SessionStore};
