#![doc = "The `todoforge` library crate."]
#![doc = ""]
#![doc = "This crate contains the business logic, domain models, authentication"]
#![doc = "mechanisms, routing configuration, and error handling for the TodoForge"]
#![doc = "application: a todo-list REST API whose persistence is delegated to an"]
#![doc = "external JSON document store reachable over HTTP. It is used by the main"]
#![doc = "binary (`main.rs`) to construct and run the application."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod response;
pub mod routes;
