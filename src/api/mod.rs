//! Talking to the remote REST API: the shared client, its interceptor
//! chain, and the authentication endpoints on top of it.

pub mod client;
pub mod error;
pub mod remote;

pub use client::{
    AlreadyAttached, ApiClient, Interception, InterceptorId, InterceptorRegistration,
    ResponseInterceptor,
};
pub use error::{ApiError, AuthFailure, CREDENTIALS_NOT_PROVIDED};
pub use remote::{AuthApi, HttpAuthApi};
