pub mod admin;
pub mod chain;
pub mod health;
pub mod keys;
pub mod stream;
pub mod universal;
