pub mod token;
pub mod token_store;

pub use token::{Identity, Token, TokenKind};
pub use token_store::TokenStore;
