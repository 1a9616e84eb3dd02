//! Chat transports that feed user turns into a `Collector`.

pub mod cli;
pub mod ws;

pub use cli::CliChannel;
pub use ws::chat_routes;
