pub mod calls;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod workflow;
pub mod ws;

pub use routes::create_router;
pub use ws::{WsBroadcaster, WsMessage};
