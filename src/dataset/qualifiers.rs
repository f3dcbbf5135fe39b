//! Types 1858 (measurement qualifiers) and 1860 (transducer).  Write-only.
//!
//! Both travel next to a type 58 block to carry acquisition metadata the
//! measurement layout has no room for.

use super::{ascii_header, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::field::LineWriter;
use crate::record::Record;

fn write_only(dataset_type: DatasetType) -> RecordError {
    RecordError::UnsupportedType { type_code: dataset_type.code() }
}

// ── 1858 ─────────────────────────────────────────────────────────────────────

pub struct QualifiersCodec;

impl DatasetCodec for QualifiersCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::MeasurementQualifiers }

    fn decode(&self, _: &BlockView<'_>, _: &mut Vec<String>) -> Result<Record, RecordError> {
        Err(write_only(DatasetType::MeasurementQualifiers))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::MeasurementQualifiers(q) = record else {
            return Err(wrong_record(DatasetType::MeasurementQualifiers, record));
        };
        ascii_header(DatasetType::MeasurementQualifiers, out);

        for v in [q.set_record, q.octave_format, q.measurement_run, 0, 0, 0] {
            out.int(12, v);
        }
        out.end();

        for v in [
            q.weighting,
            q.window,
            q.amplitude_units,
            q.normalization,
            q.abscissa_qualifier,
            q.ordinate_num_qualifier,
            q.ordinate_den_qualifier,
            q.z_qualifier,
            q.sampling_type,
            0,
            0,
            0,
        ] {
            out.int(6, v);
        }
        out.end();

        let [u1, u2, u3, u4] = q.user_values;
        for row in [
            [q.z_rpm, q.z_time, q.z_order, q.sample_count, 0.0, 0.0],
            [u1, u2, u3, u4, q.exponential_damping, 0.0],
            [0.0; 6],
        ] {
            for v in row {
                out.exp(13, 5, v);
            }
            out.end();
        }

        out.text(4, &q.response_direction)
            .blank(2)
            .text(4, &q.reference_direction)
            .end();
        out.line("NONE").line("NONE");
        Ok(())
    }
}

// ── 1860 ─────────────────────────────────────────────────────────────────────

pub struct TransducerCodec;

impl DatasetCodec for TransducerCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::Transducer }

    fn decode(&self, _: &BlockView<'_>, _: &mut Vec<String>) -> Result<Record, RecordError> {
        Err(write_only(DatasetType::Transducer))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::Transducer(t) = record else {
            return Err(wrong_record(DatasetType::Transducer, record));
        };
        ascii_header(DatasetType::Transducer, out);
        out.int(10, t.record_number).int(10, t.node).int(10, t.direction).end();
        out.line(&t.model).line(&t.serial);
        out.exp(13, 5, t.sensitivity)
            .exp(13, 5, t.reference_frequency)
            .exp(13, 5, t.excitation)
            .end();
        out.int(10, t.data_type)
            .int(5, t.length_exp)
            .int(5, t.force_exp)
            .int(5, t.temp_exp)
            .blank(1)
            .text(20, &t.units)
            .end();
        Ok(())
    }
}
