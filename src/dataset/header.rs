//! Type 151: file header.

use chrono::Local;

use super::{ascii_header, at_line, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::field::LineWriter;
use crate::record::{FileHeader, Record};

const DATE_FORMAT: &str = "%d-%b-%y";
const TIME_FORMAT: &str = "%H:%M:%S";

pub struct FileHeaderCodec;

impl DatasetCodec for FileHeaderCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::FileHeader }

    fn decode(&self, block: &BlockView<'_>, _: &mut Vec<String>) -> Result<Record, RecordError> {
        let text = |i: usize| block.line_or_blank(i).full_text();
        let created = block.line_or_blank(3);
        let saved   = block.line_or_blank(4);
        let written = block.line_or_blank(6);

        Ok(Record::FileHeader(FileHeader {
            model_name:   text(0),
            description:  text(1),
            db_app:       text(2),
            date_created: created.text(1, 10),
            time_created: created.text(11, 10),
            db_version:   [
                created.int(21, 10).map_err(at_line(4))?,
                created.int(31, 10).map_err(at_line(4))?,
            ],
            file_type:    created.int(41, 10).map_err(at_line(4))?,
            date_saved:   saved.text(1, 10),
            time_saved:   saved.text(11, 10),
            program:      text(5),
            date_written: written.text(1, 10),
            time_written: written.text(11, 10),
        }))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::FileHeader(h) = record else {
            return Err(wrong_record(DatasetType::FileHeader, record));
        };
        let now = Local::now();
        let date_written = if h.date_written.is_empty() {
            now.format(DATE_FORMAT).to_string()
        } else {
            h.date_written.clone()
        };
        let time_written = if h.time_written.is_empty() {
            now.format(TIME_FORMAT).to_string()
        } else {
            h.time_written.clone()
        };

        ascii_header(DatasetType::FileHeader, out);
        out.line(&h.model_name)
            .line(&h.description)
            .line(&h.db_app);
        out.text(10, &h.date_created)
            .text(10, &h.time_created)
            .int(10, h.db_version[0])
            .int(10, h.db_version[1])
            .int(10, h.file_type)
            .end();
        out.text(10, &h.date_saved).text(10, &h.time_saved).end();
        out.line(&h.program);
        out.text(10, &date_written).text(10, &time_written).end();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::testing::{decode_bytes, roundtrip};

    #[test]
    fn minimal_header_reads_trimmed() {
        let body = b"   151\nTestModel   \nDemo\nApp1\n";
        let (record, warnings) = decode_bytes(body);
        assert!(warnings.is_empty());
        let Record::FileHeader(h) = record.unwrap() else { panic!("wrong variant") };
        assert_eq!(h.model_name, "TestModel");
        assert_eq!(h.description, "Demo");
        assert_eq!(h.db_app, "App1");
        assert_eq!(h.date_created, "");
        assert_eq!(h.program, "");
        assert_eq!(h.db_version, [0, 0]);
    }

    #[test]
    fn full_roundtrip() {
        let header = FileHeader {
            model_name:   "bracket".into(),
            description:  "modal survey".into(),
            db_app:       "I-DEAS".into(),
            date_created: "01-Feb-24".into(),
            time_created: "10:11:12".into(),
            db_version:   [12, 3],
            file_type:    1,
            date_saved:   "02-Feb-24".into(),
            time_saved:   "08:00:00".into(),
            program:      "uffkit".into(),
            date_written: "03-Feb-24".into(),
            time_written: "09:30:00".into(),
        };
        let record = Record::FileHeader(header);
        assert_eq!(roundtrip(&record), record);
    }

    #[test]
    fn empty_write_stamp_is_filled() {
        let Record::FileHeader(h) = roundtrip(&Record::FileHeader(FileHeader::default())) else {
            panic!("wrong variant")
        };
        assert_eq!(h.date_written.len(), 9);
        assert_eq!(h.time_written.len(), 8);
    }

    #[test]
    fn bad_version_field() {
        let body = b"   151\nm\nd\na\n01-Feb-24 10:11:12         x\n";
        let (record, _) = decode_bytes(body);
        assert_eq!(record.unwrap_err().code(), 6);
    }
}
