pub mod command_handler;
pub mod query_handler;

pub use command_handler::AlbumCommandHandler;
pub use query_handler::AlbumQueryHandler;
