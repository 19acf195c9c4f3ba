//! Built-in components

pub mod auth;
pub mod echo;
pub mod hello;

pub use auth::AuthComponent;
pub use echo::Echo;
pub use hello::Hello;
