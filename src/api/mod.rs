// src/api/mod.rs

pub mod http;
pub mod routes;

pub use routes::build_router;
