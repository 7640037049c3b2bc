pub mod reader;

pub use reader::{FileReader, ReaderOptions, DEFAULT_READ_BUFFER_SIZE};
