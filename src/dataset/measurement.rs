//! Type 58 / 58b: function at a degree of freedom.
//!
//! # How it works
//!
//! Eleven ASCII header lines are followed by the samples, either as a flat
//! ASCII numeric run or, for `58b`, as a raw IEEE payload.  The on-disk
//! layout of the samples is one of eight cases, selected by three bits:
//!
//! | precision | kind | ordinate type | even ASCII | uneven ASCII | binary group |
//! |-----------|------|---------------|------------|--------------|--------------|
//! | single | real    | 2 | 6 × E13.5        | 3 × (x, y)     | \[f32 x\] f32     |
//! | single | complex | 5 | 3 × (re, im)     | 2 × (x, re, im) | \[f32 x\] f32 f32 |
//! | double | real    | 4 | 4 × E20.12       | 2 × (x, y)     | \[f32 x\] f64     |
//! | double | complex | 6 | 2 × (re, im)     | 1 × (x, re, im) | \[f32 x\] f64 f64 |
//!
//! Abscissa values of uneven functions are always single precision
//! (`E13.5` / `f32`).  Even functions store no abscissa at all; it is
//! rebuilt as `xmin + i·dx`.
//!
//! The encoder never trusts a stored case: it derives precision from the
//! record, the kind from the ordinate series variant, and the spacing from
//! the abscissa values themselves.
//!
//! # Binary payload checks
//!
//! The declared byte count is cross-checked against the bytes that sit
//! between the last ASCII line and the closing sentinel:
//!
//! - declared count larger than available bytes: `NotEnoughData`;
//! - point count implied by the byte count differs from line 7: warn, use
//!   the larger of the two;
//! - bytes left over beyond the payload and one line terminator: warn, skip.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::{at_line, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::block::{Envelope, FLOAT_FORMAT_IEEE, MEASUREMENT_ASCII_LINES};
use crate::field::{float_run, Line, LineWriter};
use crate::record::{Axis, Complex, Endian, Measurement, Precision, Record, Series};

const ID_LINES:     usize = 5;
const DATA_LINE:    usize = MEASUREMENT_ASCII_LINES as usize;
/// Relative tolerance for treating abscissa steps as equal.
const EVEN_STEP_TOLERANCE: f64 = 1e-9;
/// Rounding slack of `xmin + i·dx`, in units of the largest |x|.
const EVEN_ROUNDING_ULPS: f64 = 8.0 * f64::EPSILON;

// ── Case table ───────────────────────────────────────────────────────────────

/// One of the eight on-disk sample layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasurementCase {
    pub precision: Precision,
    pub complex:   bool,
    pub even:      bool,
}

impl MeasurementCase {
    pub const ALL: [MeasurementCase; 8] = {
        let mut all = [MeasurementCase { precision: Precision::Single, complex: false, even: false }; 8];
        let mut i = 0;
        while i < 8 {
            all[i] = MeasurementCase {
                precision: if i & 4 == 0 { Precision::Single } else { Precision::Double },
                complex:   i & 2 != 0,
                even:      i & 1 != 0,
            };
            i += 1;
        }
        all
    };

    /// Case named by a line-7 ordinate type code and spacing flag.
    pub fn from_ordinate_type(code: i64, even: bool) -> Self {
        Self {
            precision: if matches!(code, 2 | 5) { Precision::Single } else { Precision::Double },
            complex:   matches!(code, 5 | 6),
            even,
        }
    }

    /// Case the encoder selects for `m`.
    pub fn of(m: &Measurement) -> Self {
        Self {
            precision: m.precision,
            complex:   m.data.is_complex(),
            even:      even_step(&m.x).is_some(),
        }
    }

    pub fn ordinate_type(self) -> i64 {
        match (self.precision, self.complex) {
            (Precision::Single, false) => 2,
            (Precision::Single, true)  => 5,
            (Precision::Double, false) => 4,
            (Precision::Double, true)  => 6,
        }
    }

    /// Ordinate reals per sample.
    fn values(self) -> usize {
        if self.complex { 2 } else { 1 }
    }

    /// Numbers per sample in an ASCII run, abscissa included.
    fn ascii_group(self) -> usize {
        self.values() + usize::from(!self.even)
    }

    fn ordinate_bytes(self) -> usize {
        match self.precision {
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }

    /// Bytes per sample in a binary payload.
    pub fn group_bytes(self) -> usize {
        let abscissa = if self.even { 0 } else { 4 };
        abscissa + self.values() * self.ordinate_bytes()
    }

    /// Samples per ASCII line.
    fn groups_per_line(self) -> usize {
        match (self.even, self.precision, self.complex) {
            (true,  Precision::Single, false) => 6,
            (true,  Precision::Single, true)  => 3,
            (true,  Precision::Double, false) => 4,
            (true,  Precision::Double, true)  => 2,
            (false, Precision::Single, false) => 3,
            (false, Precision::Single, true)  => 2,
            (false, Precision::Double, false) => 2,
            (false, Precision::Double, true)  => 1,
        }
    }

    /// `(width, digits)` of an ordinate field.
    fn ordinate_field(self) -> (usize, usize) {
        match self.precision {
            Precision::Single => (13, 5),
            Precision::Double => (20, 12),
        }
    }
}

/// The common step of `x` when it is evenly spaced.  Fewer than two points
/// are even with an unknown step.
///
/// Every value is compared with `x[0] + i·step`; the allowed deviation covers
/// both a relative step error and the rounding of large offsets.
fn even_step(x: &[f64]) -> Option<Option<f64>> {
    let (first, last) = match x {
        [] | [_] => return Some(None),
        [first, .., last] => (*first, *last),
    };
    let step = (last - first) / (x.len() - 1) as f64;
    let magnitude = x.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let tol = (EVEN_STEP_TOLERANCE * step.abs()).max(EVEN_ROUNDING_ULPS * magnitude);
    x.iter()
        .enumerate()
        .all(|(i, &v)| (v - (first + i as f64 * step)).abs() <= tol)
        .then_some(Some(step))
}

// ── Header lines ─────────────────────────────────────────────────────────────

fn decode_axis(line: Line<'_>, number: usize) -> Result<Axis, RecordError> {
    let int = |start, width| line.int(start, width).map_err(at_line(number));
    Ok(Axis {
        data_type:  int(1, 10)?,
        length_exp: int(11, 5)?,
        force_exp:  int(16, 5)?,
        temp_exp:   int(21, 5)?,
        label:      line.text(27, 20),
        units:      line.text(48, 20),
    })
}

fn encode_axis(axis: &Axis, out: &mut LineWriter) {
    out.int(10, axis.data_type)
        .int(5, axis.length_exp)
        .int(5, axis.force_exp)
        .int(5, axis.temp_exp)
        .blank(1)
        .text(20, &axis.label)
        .blank(1)
        .text(20, &axis.units)
        .end();
}

/// Line 7 values.
struct Sampling {
    ordinate_type: i64,
    points:        i64,
    even:          bool,
    xmin:          f64,
    dx:            f64,
    z:             f64,
}

impl Sampling {
    fn decode(line: Line<'_>) -> Result<Self, RecordError> {
        let v = float_run([line]).map_err(at_line(7))?;
        if v.len() < 5 {
            return Err(RecordError::InvalidData(format!(
                "line 7 holds {} values, expected 6",
                v.len()
            )));
        }
        Ok(Self {
            ordinate_type: v[0] as i64,
            points:        v[1] as i64,
            even:          v[2] as i64 != 0,
            xmin:          v[3],
            dx:            v[4],
            z:             v.get(5).copied().unwrap_or(0.0),
        })
    }
}

// ── Samples ──────────────────────────────────────────────────────────────────

/// Split a flat run of sample numbers into abscissa and ordinates.
fn split_samples(case: MeasurementCase, run: &[f64], points: usize, sampling: &Sampling) -> (Vec<f64>, Series) {
    let group = case.ascii_group();
    let mut x = Vec::with_capacity(points);
    let mut re = Vec::with_capacity(points);
    let mut im = Vec::with_capacity(if case.complex { points } else { 0 });

    for (i, g) in run.chunks_exact(group).take(points).enumerate() {
        let (abscissa, values) = if case.even {
            (sampling.xmin + i as f64 * sampling.dx, g)
        } else {
            (g[0], &g[1..])
        };
        x.push(abscissa);
        re.push(values[0]);
        if case.complex {
            im.push(values[1]);
        }
    }

    let data = if case.complex {
        Series::Complex(re.into_iter().zip(im).map(|(r, i)| Complex::new(r, i)).collect())
    } else {
        Series::Real(re)
    };
    (x, data)
}

/// Caller guarantees `bytes` holds `points` groups.
fn read_binary<B: ByteOrder>(case: MeasurementCase, bytes: &[u8], points: usize) -> Vec<f64> {
    let width = case.ordinate_bytes();
    let mut run = Vec::with_capacity(points * case.ascii_group());
    let mut pos = 0usize;
    for _ in 0..points {
        if !case.even {
            run.push(B::read_f32(&bytes[pos..pos + 4]) as f64);
            pos += 4;
        }
        for _ in 0..case.values() {
            let value = match case.precision {
                Precision::Single => B::read_f32(&bytes[pos..pos + width]) as f64,
                Precision::Double => B::read_f64(&bytes[pos..pos + width]),
            };
            run.push(value);
            pos += width;
        }
    }
    run
}

fn write_binary<B: ByteOrder>(case: MeasurementCase, x: &[f64], ordinates: &[f64]) -> Vec<u8> {
    let values = case.values();
    let width  = case.ordinate_bytes();
    let mut buf = vec![0u8; x.len() * case.group_bytes()];
    let mut pos = 0usize;
    for (i, &abscissa) in x.iter().enumerate() {
        if !case.even {
            B::write_f32(&mut buf[pos..pos + 4], abscissa as f32);
            pos += 4;
        }
        for &v in &ordinates[i * values..(i + 1) * values] {
            match case.precision {
                Precision::Single => B::write_f32(&mut buf[pos..pos + width], v as f32),
                Precision::Double => B::write_f64(&mut buf[pos..pos + width], v),
            }
            pos += width;
        }
    }
    buf
}

/// Length of a single trailing line terminator.
fn terminator_len(tail: &[u8]) -> usize {
    if tail.ends_with(b"\r\n") {
        2
    } else if tail.ends_with(b"\n") {
        1
    } else {
        0
    }
}

// ── Codec ────────────────────────────────────────────────────────────────────

pub struct MeasurementCodec;

impl MeasurementCodec {
    /// Number run of a binary payload, after the byte count checks.
    fn binary_run(
        block: &BlockView<'_>,
        case: MeasurementCase,
        declared_points: usize,
        warnings: &mut Vec<String>,
    ) -> Result<(Vec<f64>, usize), RecordError> {
        let envelope = block.envelope;
        if envelope.float_format != FLOAT_FORMAT_IEEE {
            return Err(RecordError::UnsupportedFloatFormat(envelope.float_format));
        }
        let endian = envelope.endian().ok_or_else(|| {
            RecordError::MalformedHeader(format!("byte order {}", envelope.byte_order))
        })?;

        let payload = block.payload_bytes();
        let available = payload.len();
        let declared = usize::try_from(envelope.byte_count).unwrap_or(0);
        if declared > available {
            return Err(RecordError::NotEnoughData { needed: declared, available });
        }

        let group = case.group_bytes();
        let implied = declared / group;
        let points = if implied != declared_points {
            let used = implied.max(declared_points);
            warnings.push(format!(
                "byte count {declared} implies {implied} points, header declares {declared_points}; using {used}"
            ));
            used
        } else {
            declared_points
        };

        let needed = points.checked_mul(group).unwrap_or(usize::MAX);
        if needed > available {
            return Err(RecordError::NotEnoughData { needed, available });
        }
        let tail = &payload[needed..];
        let extra = tail.len() - terminator_len(tail);
        if extra > 0 {
            warnings.push(format!("skipped {extra} trailing bytes after the binary payload"));
        }

        let run = match endian {
            Endian::Little => read_binary::<LittleEndian>(case, payload, points),
            Endian::Big    => read_binary::<BigEndian>(case, payload, points),
        };
        Ok((run, points))
    }
}

impl DatasetCodec for MeasurementCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::Measurement }

    fn decode(&self, block: &BlockView<'_>, warnings: &mut Vec<String>) -> Result<Record, RecordError> {
        let ids: [String; 5] = std::array::from_fn(|i| block.line_or_blank(i).full_text());

        let dof = block.line(ID_LINES)?;
        let int = |start, width| dof.int(start, width).map_err(at_line(6));
        let sampling = Sampling::decode(block.line(ID_LINES + 1)?)?;
        let axes: Vec<Axis> = (ID_LINES + 2..DATA_LINE)
            .map(|i| decode_axis(block.line(i)?, i + 1))
            .collect::<Result<_, _>>()?;
        let [abscissa, ordinate_num, ordinate_den, z_axis]: [Axis; 4] = axes
            .try_into()
            .map_err(|_| RecordError::InvalidData("axis lines".into()))?;

        let case = MeasurementCase::from_ordinate_type(sampling.ordinate_type, sampling.even);
        let declared_points = usize::try_from(sampling.points).unwrap_or(0);

        let (run, points) = if block.envelope.binary {
            Self::binary_run(block, case, declared_points, warnings)?
        } else {
            let run = float_run(block.lines_from(DATA_LINE)).map_err(at_line(DATA_LINE + 1))?;
            let available = run.len() / case.ascii_group();
            if available < declared_points {
                return Err(RecordError::InvalidData(format!(
                    "{declared_points} points declared, {available} present"
                )));
            }
            if available > declared_points || run.len() % case.ascii_group() != 0 {
                warnings.push(format!(
                    "ignoring {} values after the {declared_points} declared points",
                    run.len() - declared_points * case.ascii_group()
                ));
            }
            (run, declared_points)
        };
        let (x, data) = split_samples(case, &run, points, &sampling);

        Ok(Record::Measurement(Measurement {
            ids,
            function_type:       int(1, 5)?,
            function_id:         int(6, 10)?,
            version:             int(16, 5)?,
            load_case:           int(21, 10)?,
            response_entity:     dof.text(32, 10),
            response_node:       int(42, 10)?,
            response_direction:  int(52, 4)?,
            reference_entity:    dof.text(57, 10),
            reference_node:      int(67, 10)?,
            reference_direction: int(77, 4)?,
            abscissa_min:        sampling.xmin,
            abscissa_inc:        sampling.dx,
            z_value:             sampling.z,
            abscissa,
            ordinate_num,
            ordinate_den,
            z_axis,
            x,
            data,
            precision:           case.precision,
            binary:              block.envelope.binary,
            endian:              if block.envelope.binary {
                block.envelope.endian().unwrap_or_default()
            } else {
                Endian::default()
            },
        }))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::Measurement(m) = record else {
            return Err(wrong_record(DatasetType::Measurement, record));
        };
        let n = m.data.len();
        if !m.x.is_empty() && m.x.len() != n {
            return Err(RecordError::InvalidRecord(format!(
                "{} abscissa values for {n} ordinates",
                m.x.len()
            )));
        }
        let case = MeasurementCase::of(m);
        let (xmin, dx) = match even_step(&m.x) {
            Some(Some(step)) => (m.x[0], step),
            Some(None)       => (m.x.first().copied().unwrap_or(m.abscissa_min), m.abscissa_inc),
            None             => (m.x[0], m.abscissa_inc),
        };
        let x: Vec<f64> = if m.x.is_empty() {
            (0..n).map(|i| xmin + i as f64 * dx).collect()
        } else {
            m.x.clone()
        };
        let ordinates: Vec<f64> = match &m.data {
            Series::Real(v)    => v.clone(),
            Series::Complex(v) => v.iter().flat_map(|c| [c.re, c.im]).collect(),
        };

        if m.binary {
            Envelope::binary(DatasetType::Measurement.code(), m.endian, (n * case.group_bytes()) as i64)
                .write(out);
        } else {
            Envelope::ascii(DatasetType::Measurement.code()).write(out);
        }

        for id in &m.ids {
            out.line(id);
        }
        out.int(5, m.function_type)
            .int(10, m.function_id)
            .int(5, m.version)
            .int(10, m.load_case)
            .blank(1)
            .text(10, &m.response_entity)
            .int(10, m.response_node)
            .int(4, m.response_direction)
            .blank(1)
            .text(10, &m.reference_entity)
            .int(10, m.reference_node)
            .int(4, m.reference_direction)
            .end();
        out.int(10, case.ordinate_type())
            .int(10, n as i64)
            .int(10, i64::from(case.even))
            .exp(13, 5, xmin)
            .exp(13, 5, dx)
            .exp(13, 5, m.z_value)
            .end();
        for axis in [&m.abscissa, &m.ordinate_num, &m.ordinate_den, &m.z_axis] {
            encode_axis(axis, out);
        }

        if m.binary {
            let payload = match m.endian {
                Endian::Little => write_binary::<LittleEndian>(case, &x, &ordinates),
                Endian::Big    => write_binary::<BigEndian>(case, &x, &ordinates),
            };
            out.raw(&payload).end();
        } else {
            let values = case.values();
            let (width, digits) = case.ordinate_field();
            let per_line = case.groups_per_line() * case.ascii_group();
            let mut run = out.wrapped(per_line);
            for (i, &abscissa) in x.iter().enumerate() {
                if !case.even {
                    run.exp(13, 5, abscissa);
                }
                for &v in &ordinates[i * values..(i + 1) * values] {
                    run.exp(width, digits, v);
                }
            }
            run.finish();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::encode_record;
    use crate::dataset::testing::{decode_bytes, decode_file, roundtrip};
    use proptest::prelude::*;

    /// Samples exactly representable in every on-disk case.
    fn sample(case: MeasurementCase, n: usize) -> Measurement {
        let data = if case.complex {
            Series::Complex((0..n).map(|i| Complex::new(i as f64 * 0.5, -(i as f64) * 0.25)).collect())
        } else {
            Series::Real((0..n).map(|i| 1.0 + i as f64 * 0.125).collect())
        };
        let mut m = if case.even {
            Measurement::even(2.0, 0.5, data)
        } else {
            Measurement::uneven((0..n).map(|i| (i * i) as f64 * 0.25).collect(), data)
        };
        m.precision = case.precision;
        m.ids[0] = "Point1:+Z / Point1:+Z".into();
        m.function_type = 4;
        m.response_entity = "Point1".into();
        m.response_node = 1;
        m.response_direction = 3;
        m.abscissa = Axis { data_type: 18, label: "Frequency".into(), units: "Hz".into(), ..Default::default() };
        m
    }

    fn header_line(bytes: &[u8], n: usize) -> String {
        String::from_utf8_lossy(bytes).lines().nth(n).unwrap_or_default().to_string()
    }

    #[test]
    fn case_table_is_complete() {
        let codes: Vec<(i64, bool)> = MeasurementCase::ALL
            .iter()
            .map(|c| (c.ordinate_type(), c.even))
            .collect();
        assert_eq!(codes.len(), 8);
        let distinct: std::collections::HashSet<MeasurementCase> = MeasurementCase::ALL.into_iter().collect();
        assert_eq!(distinct.len(), 8);
        for c in MeasurementCase::ALL {
            assert_eq!(MeasurementCase::from_ordinate_type(c.ordinate_type(), c.even), c);
        }
        let bytes: Vec<usize> = MeasurementCase::ALL.iter().map(|c| c.group_bytes()).collect();
        assert_eq!(bytes, vec![8, 4, 12, 8, 12, 8, 20, 16]);
    }

    #[test]
    fn every_case_roundtrips_ascii_and_binary() {
        for case in MeasurementCase::ALL {
            for binary in [false, true] {
                for endian in [Endian::Little, Endian::Big] {
                    let mut m = sample(case, 13);
                    m.binary = binary;
                    m.endian = if binary { endian } else { Endian::Little };
                    let record = Record::Measurement(m);
                    let back = roundtrip(&record);
                    assert_eq!(back, record, "case {case:?} binary {binary}");
                    let Record::Measurement(back) = back else { unreachable!() };
                    assert_eq!(MeasurementCase::of(&back), case);
                }
            }
        }
    }

    #[test]
    fn toggling_precision_or_spacing_changes_layout() {
        let base = sample(MeasurementCase { precision: Precision::Double, complex: false, even: true }, 5);
        let line7 = |m: &Measurement| {
            let bytes = encode_record(&Record::Measurement(m.clone())).unwrap();
            let line = header_line(&bytes, 7);
            (line[..10].trim().to_string(), line[20..30].trim().to_string())
        };
        assert_eq!(line7(&base), ("4".to_string(), "1".to_string()));

        let mut single = base.clone();
        single.precision = Precision::Single;
        assert_eq!(line7(&single), ("2".to_string(), "1".to_string()));

        let mut uneven = base.clone();
        uneven.x[4] += 1.0;
        assert_eq!(line7(&uneven), ("4".to_string(), "0".to_string()));
    }

    #[test]
    fn ascii_line_widths_follow_case() {
        let m = sample(MeasurementCase { precision: Precision::Double, complex: true, even: false }, 3);
        let bytes = encode_record(&Record::Measurement(m)).unwrap();
        let data_line = header_line(&bytes, 12);
        assert_eq!(data_line.len(), 13 + 20 + 20);

        let m = sample(MeasurementCase { precision: Precision::Single, complex: false, even: true }, 7);
        let bytes = encode_record(&Record::Measurement(m)).unwrap();
        assert_eq!(header_line(&bytes, 12).len(), 6 * 13);
        assert_eq!(header_line(&bytes, 13).len(), 13);
    }

    #[test]
    fn binary_byte_count_is_exact() {
        let mut m = sample(MeasurementCase { precision: Precision::Single, complex: true, even: false }, 10);
        m.binary = true;
        let bytes = encode_record(&Record::Measurement(m)).unwrap();
        let header = header_line(&bytes, 0);
        assert_eq!(&header[..7], "    58b");
        assert_eq!(header[31..43].trim(), "120");
    }

    /// A binary block followed by `extra` stray bytes the header does not count.
    fn binary_block_with_extra(extra: usize) -> (Measurement, Vec<u8>) {
        let mut m = sample(MeasurementCase { precision: Precision::Double, complex: false, even: true }, 6);
        m.binary = true;
        let body = encode_record(&Record::Measurement(m.clone())).unwrap();
        // Body ends with payload + '\n'; splice the stray bytes before the terminator.
        let mut file = b"    -1\n".to_vec();
        file.extend_from_slice(&body[..body.len() - 1]);
        file.extend(std::iter::repeat(0xAB).take(extra));
        file.extend_from_slice(b"\n    -1\n");
        (m, file)
    }

    #[test]
    fn trailing_bytes_warn_and_keep_declared_count() {
        let (m, file) = binary_block_with_extra(8);
        let (record, warnings) = decode_file(&file);
        let Record::Measurement(back) = record.unwrap() else { panic!("wrong variant") };
        assert_eq!(back.data.len(), 6);
        assert_eq!(back, m);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("trailing"));
    }

    #[test]
    fn short_payload_is_not_enough_data() {
        let mut m = sample(MeasurementCase { precision: Precision::Double, complex: false, even: true }, 6);
        m.binary = true;
        let body = encode_record(&Record::Measurement(m)).unwrap();
        let mut cut = body[..body.len() - 17].to_vec();
        cut.push(b'\n');
        let (record, _) = decode_bytes(&cut);
        assert!(matches!(record, Err(RecordError::NotEnoughData { .. })));
    }

    #[test]
    fn point_count_mismatch_uses_larger() {
        let mut m = sample(MeasurementCase { precision: Precision::Double, complex: false, even: true }, 4);
        m.binary = true;
        let mut body = encode_record(&Record::Measurement(m)).unwrap();
        // Declare 3 points on line 7 while the byte count still covers 4.
        let from: &[u8] = b"         4         4         1";
        let at = body.windows(from.len()).position(|w| w == from).unwrap();
        body[at + 19] = b'3';
        let (record, warnings) = decode_bytes(&body);
        let Record::Measurement(back) = record.unwrap() else { panic!("wrong variant") };
        assert_eq!(back.data.len(), 4);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn header_count_above_byte_count_reads_header_count() {
        let mut m = sample(MeasurementCase { precision: Precision::Double, complex: false, even: true }, 6);
        m.binary = true;
        let mut body = encode_record(&Record::Measurement(m.clone())).unwrap();
        // Byte count claims 4 points; line 7 and the payload still hold 6.
        assert_eq!(&body[31..43], b"          48");
        body[31..43].copy_from_slice(b"          32");
        let (record, warnings) = decode_bytes(&body);
        let Record::Measurement(back) = record.unwrap() else { panic!("wrong variant") };
        assert_eq!(back, m);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("using 6"));
    }

    #[test]
    fn huge_point_count_is_not_enough_data() {
        let mut m = sample(MeasurementCase { precision: Precision::Double, complex: false, even: true }, 4);
        m.binary = true;
        let mut body = encode_record(&Record::Measurement(m)).unwrap();
        let from: &[u8] = b"         4         4         1";
        let at = body.windows(from.len()).position(|w| w == from).unwrap();
        body[at + 10..at + 20].copy_from_slice(b"   1.0E+19");
        let (record, _) = decode_bytes(&body);
        assert!(matches!(record, Err(RecordError::NotEnoughData { .. })));
    }

    #[test]
    fn offset_even_abscissa_stays_even() {
        let data = Series::Real((0..100).map(|i| i as f64 * 0.5).collect());
        let mut m = Measurement::even(1.0e5, 1.0e-3, data);
        assert!(MeasurementCase::of(&m).even);

        for binary in [false, true] {
            m.binary = binary;
            let record = Record::Measurement(m.clone());
            let back = roundtrip(&record);
            assert_eq!(back, record, "binary {binary}");
            let Record::Measurement(back) = back else { unreachable!() };
            assert!(back.x[1] > back.x[0]);
        }
    }

    #[test]
    fn even_step_scales_with_offset() {
        let x: Vec<f64> = (0..1000).map(|i| 2.0e6 + i as f64 * 1.0e-4).collect();
        assert!(even_step(&x).and_then(|s| s).is_some());

        let mut bent = x.clone();
        bent[500] += 1.0e-6;
        assert_eq!(even_step(&bent), None);
        assert_eq!(even_step(&[3.0]), Some(None));
    }

    #[test]
    fn unsupported_float_format() {
        let mut m = sample(MeasurementCase { precision: Precision::Single, complex: false, even: true }, 2);
        m.binary = true;
        let mut body = encode_record(&Record::Measurement(m)).unwrap();
        body[18] = b'3';
        let (record, _) = decode_bytes(&body);
        assert_eq!(record.unwrap_err(), RecordError::UnsupportedFloatFormat(3));
    }

    #[test]
    fn reads_fused_ascii_columns() {
        let mut m = sample(MeasurementCase { precision: Precision::Single, complex: false, even: true }, 3);
        m.data = Series::Real(vec![1.0, -2.0, 3.0]);
        let body = encode_record(&Record::Measurement(m.clone())).unwrap();
        let text = String::from_utf8_lossy(&body).replace("  1.00000E+00 -2.00000E+00", "  1.00000E+00-2.00000E+00");
        let (record, _) = decode_bytes(text.as_bytes());
        let Record::Measurement(back) = record.unwrap() else { panic!("wrong variant") };
        assert_eq!(back.data, m.data);
    }

    proptest! {
        #[test]
        fn binary_double_is_exact(values in proptest::collection::vec(-1.0e12f64..1.0e12, 1..64), big in any::<bool>()) {
            let mut m = Measurement::even(0.0, 1.0, Series::Real(values));
            m.binary = true;
            m.endian = if big { Endian::Big } else { Endian::Little };
            let record = Record::Measurement(m);
            prop_assert_eq!(roundtrip(&record), record);
        }

        #[test]
        fn ascii_double_within_tolerance(values in proptest::collection::vec(-1.0e6f64..1.0e6, 1..40)) {
            let m = Measurement::even(0.0, 1.0, Series::Real(values.clone()));
            let Record::Measurement(back) = roundtrip(&Record::Measurement(m)) else {
                panic!("wrong variant")
            };
            let Series::Real(got) = back.data else { panic!("wrong series") };
            for (a, b) in values.iter().zip(&got) {
                prop_assert!((a - b).abs() <= a.abs() * 1e-8 + 1e-300);
            }
        }
    }
}
