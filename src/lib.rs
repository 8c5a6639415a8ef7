// Library exports for Marquee
// Integration tests build the router through these modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod guard;
pub mod likes;
pub mod resource;
pub mod routes;
pub mod state;
pub mod store;
