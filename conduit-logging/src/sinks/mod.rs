pub mod buffer;
pub mod console;
pub mod file;

pub use buffer::BufferedSink;
pub use console::ConsoleSink;
pub use file::FileSink;
