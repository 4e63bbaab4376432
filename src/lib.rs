// Library exports for CUR8tr
// This allows integration tests and external code to use CUR8tr modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod images;
pub mod messages;
pub mod routes;
pub mod state;
pub mod tags;
pub mod text;
pub mod welcome;
