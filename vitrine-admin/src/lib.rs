pub mod handlers;
pub mod server;

pub use server::{AdminState, build_admin_router, start_admin};
