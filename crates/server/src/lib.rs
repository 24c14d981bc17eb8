pub mod cookies;
pub mod errors;
pub mod extract;
pub mod guard;
pub mod openapi;
pub mod routes;
pub mod startup;

pub use startup::run;
