mod file_reader;
mod memory_reader;
mod range_reader;

pub use file_reader::FileRangeReader;
pub use memory_reader::MemoryRangeReader;
pub use range_reader::{read_u16_le, read_u32_le, read_u64_le, RangeReader};
