pub mod profile;
pub mod requests;
pub mod token;

pub use profile::Profile;
pub use requests::{RegisterRequest, SignInRequest};
pub use token::TokenSet;
