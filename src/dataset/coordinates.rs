//! Types 18 (coordinate systems) and 2420 (coordinate system matrices).
//!
//! Type 18 defines each system by three points: origin, a point on +X and a
//! point in the +XZ plane, four lines per system.  Type 2420 is the matrix
//! form written by newer tools; it is write-only here.

use super::{ascii_header, at_line, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::field::{float_run, LineWriter};
use crate::record::{CoordinateMatrices, CoordinateSystem, Record};

const LINES_PER_SYSTEM: usize = 4;

// ── 18 ───────────────────────────────────────────────────────────────────────

pub struct CoordinateSystemsCodec;

impl DatasetCodec for CoordinateSystemsCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::CoordinateSystems }

    fn decode(&self, block: &BlockView<'_>, warnings: &mut Vec<String>) -> Result<Record, RecordError> {
        let count = block.line_count() / LINES_PER_SYSTEM;
        let leftover = block.line_count() % LINES_PER_SYSTEM;
        if leftover != 0 {
            warnings.push(format!(
                "dataset 18: ignoring {leftover} lines after the last complete system"
            ));
        }

        let mut systems = Vec::with_capacity(count);
        for k in 0..count {
            let base = k * LINES_PER_SYSTEM;
            let ids  = block.line(base)?;
            let name = block.line(base + 1)?;
            let points = float_run([block.line(base + 2)?, block.line(base + 3)?])
                .map_err(at_line(base + 3))?;
            if points.len() < 9 {
                return Err(RecordError::InvalidData(format!(
                    "coordinate system {}: expected 9 point values, found {}",
                    k + 1,
                    points.len()
                )));
            }
            let id = |start, width| ids.int(start, width).map_err(at_line(base + 1));
            systems.push(CoordinateSystem {
                number:    id(1, 10)?,
                cs_type:   id(11, 5)?,
                reference: id(16, 10)?,
                color:     id(26, 10)?,
                method:    id(36, 10)?,
                name:      name.full_text(),
                origin:    [points[0], points[1], points[2]],
                x_point:   [points[3], points[4], points[5]],
                xz_point:  [points[6], points[7], points[8]],
            });
        }
        Ok(Record::CoordinateSystems(systems))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::CoordinateSystems(systems) = record else {
            return Err(wrong_record(DatasetType::CoordinateSystems, record));
        };
        ascii_header(DatasetType::CoordinateSystems, out);
        for cs in systems {
            out.int(10, cs.number)
                .int(5, cs.cs_type)
                .int(10, cs.reference)
                .int(10, cs.color)
                .int(10, cs.method)
                .end();
            out.line(&cs.name);
            for v in cs.origin.iter().chain(&cs.x_point) {
                out.exp(13, 5, *v);
            }
            out.end();
            for v in cs.xz_point {
                out.exp(13, 5, v);
            }
            out.end();
        }
        Ok(())
    }
}

// ── 2420 ─────────────────────────────────────────────────────────────────────

pub struct CoordinateMatricesCodec;

impl DatasetCodec for CoordinateMatricesCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::CoordinateMatrices }

    fn decode(&self, _: &BlockView<'_>, _: &mut Vec<String>) -> Result<Record, RecordError> {
        Err(RecordError::UnsupportedType { type_code: DatasetType::CoordinateMatrices.code() })
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::CoordinateMatrices(CoordinateMatrices { part_uid, part_name, systems }) = record
        else {
            return Err(wrong_record(DatasetType::CoordinateMatrices, record));
        };
        ascii_header(DatasetType::CoordinateMatrices, out);
        out.int(10, *part_uid).end();
        out.line(part_name);
        for cs in systems {
            out.int(10, cs.label).int(10, cs.cs_type).int(10, cs.color).end();
            out.line(&cs.name);
            for row in cs.rotation.iter().chain(std::iter::once(&cs.origin)) {
                for v in row {
                    out.dexp(25, 16, *v);
                }
                out.end();
            }
        }
        Ok(())
    }
}
