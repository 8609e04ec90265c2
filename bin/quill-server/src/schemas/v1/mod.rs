pub mod chat;
pub mod message;
pub mod model;
pub mod star;
pub mod user;
