pub mod file_sink;
pub mod memory_sink;
pub mod route_service;

pub use file_sink::FileSink;
pub use memory_sink::MemorySink;
pub use route_service::RouteServiceClient;
