pub mod client;
pub mod config;
pub mod db;
pub mod donor;
pub mod environment;
pub mod errors;
pub mod repository;
pub mod routes;
pub mod validation;
