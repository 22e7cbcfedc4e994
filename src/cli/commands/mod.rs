pub mod auth;
pub mod routes;
pub mod serve;
pub mod socket;
