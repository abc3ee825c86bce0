pub mod handlers;
pub mod partial;
pub mod response;
mod routes;

pub use routes::create_router;
