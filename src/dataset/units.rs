//! Type 164: unit system.
//!
//! Conversion factors are written in FORTRAN double notation (`D25.17`);
//! any exponent letter is accepted on read.

use super::{ascii_header, at_line, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::field::{float_run, LineWriter};
use crate::record::{Record, Units};

pub struct UnitsCodec;

impl DatasetCodec for UnitsCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::Units }

    fn decode(&self, block: &BlockView<'_>, _: &mut Vec<String>) -> Result<Record, RecordError> {
        let first = block.line(0)?;
        let factors = float_run(block.lines_from(1)).map_err(at_line(2))?;
        if factors.len() < 4 {
            return Err(RecordError::MissingLine {
                type_code: DatasetType::Units.code(),
                line:      3,
            });
        }

        Ok(Record::Units(Units {
            code:               first.int(1, 10).map_err(at_line(1))?,
            description:        first.text(11, 20),
            temperature_mode:   first.int(31, 10).map_err(at_line(1))?,
            length:             factors[0],
            force:              factors[1],
            temperature:        factors[2],
            temperature_offset: factors[3],
        }))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::Units(u) = record else {
            return Err(wrong_record(DatasetType::Units, record));
        };
        ascii_header(DatasetType::Units, out);
        out.int(10, u.code).text(20, &u.description).int(10, u.temperature_mode).end();
        out.dexp(25, 16, u.length)
            .dexp(25, 16, u.force)
            .dexp(25, 16, u.temperature)
            .end();
        out.dexp(25, 16, u.temperature_offset).end();
        Ok(())
    }
}
