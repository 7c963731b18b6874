mod server;
mod shutdown;

pub use server::{build_gateway, build_pool, build_provider, Server};
pub use shutdown::{Shutdown, ShutdownState};
