pub mod field;
pub mod scanner;
pub mod block;
pub mod record;
pub mod dataset;
pub mod report;
pub mod io_stream;
pub mod file;

pub use block::{parse_block, read_envelope, DataBlock, Envelope};
pub use dataset::{encode_record, get_codec, get_decoder, DatasetCodec, DatasetType, MeasurementCase, RecordError};
pub use file::{read_bytes, read_file, write_file, write_to, ReadMode, ReadOptions, UffError, UffFile, WriteMode};
pub use record::Record;
pub use report::Report;
pub use scanner::{scan, BlockRange, ScanError};
