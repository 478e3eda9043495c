pub mod messages;
pub mod routes;
