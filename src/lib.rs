pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod session;
pub mod socket;
pub mod validator;
