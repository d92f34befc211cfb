//! Identity: password login, JWT access and refresh tokens

pub mod jwt;
pub mod password;
pub mod service;

pub use jwt::{Claims, JwtKeys, TokenType};
pub use service::{AuthService, LoginRequest, RegisterRequest, Session};
