//! MCP Tool Surface (§4.5): stdio-transported tool/resource handlers over
//! the shadow cache and workflow runtime.

pub mod error;
pub mod paths;
pub mod resources;
pub mod server;
pub mod tools;

pub use error::McpSurfaceError;
pub use server::WeaverServer;
