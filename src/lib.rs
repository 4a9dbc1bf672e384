// Library exports for HopeOrb
// This allows integration tests and external code to use HopeOrb modules

pub mod config;
pub mod db;
pub mod donations;
pub mod error;
pub mod profile;
pub mod routes;
pub mod state;
