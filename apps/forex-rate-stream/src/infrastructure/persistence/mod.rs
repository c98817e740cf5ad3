//! Watchlist persistence adapters.

mod in_memory;
mod json_file;

pub use in_memory::InMemoryWatchlistRepository;
pub use json_file::JsonFileWatchlistRepository;
