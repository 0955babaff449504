use serde::{Deserialize, Serialize};

/// Body of the login call.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Body of the registration call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub re_password: String,
    pub active: bool,
}

impl Default for RegisterRequest {
    fn default() -> Self {
        RegisterRequest {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: String::new(),
            re_password: String::new(),
            active: true,
        }
    }
}
