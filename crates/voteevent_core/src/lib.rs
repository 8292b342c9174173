pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod projector;
pub mod schema;
pub mod sql;
