//! Type 55: data at nodes.
//!
//! Layout after the five id lines:
//!
//! | Line | Content |
//! |------|---------|
//! | 6 | model type, analysis type, data character, response type, data type, values per node |
//! | 7 | integer count, real count, load case, mode number or frequency step |
//! | 8.. | analysis reals, six per line |
//! | then | per node: a label line followed by one data line |
//!
//! Supported value shapes: three reals, six reals, or three complex values.

use super::{at_line, ascii_header, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::field::{float_run, int_run, LineWriter};
use crate::record::{Analysis, Complex, NodalResponse, Record, Series};

const ID_LINES: usize = 5;
const REALS_PER_LINE: usize = 6;

const DATA_REAL:    i64 = 2;
const DATA_COMPLEX: i64 = 5;

const ANALYSIS_NORMAL_MODE:  i64 = 2;
const ANALYSIS_COMPLEX:      i64 = 3;
const ANALYSIS_COMPLEX_ALT:  i64 = 7;
const ANALYSIS_FREQUENCY:    i64 = 5;

/// Number of reals stored per node for a (data type, values per node) pair.
fn reals_per_node(type_code: u32, data_type: i64, values_per_node: i64) -> Result<usize, RecordError> {
    match (data_type, values_per_node) {
        (DATA_REAL, 3)    => Ok(3),
        (DATA_REAL, 6)    => Ok(6),
        (DATA_COMPLEX, 3) => Ok(6),
        _ => Err(RecordError::Unimplemented {
            type_code,
            what: format!("data type {data_type} with {values_per_node} values per node"),
        }),
    }
}

fn analysis_reals(analysis: &Analysis) -> Vec<f64> {
    match analysis {
        Analysis::NormalMode { frequency, modal_mass, viscous_damping, hysteretic_damping, .. } => {
            vec![*frequency, *modal_mass, *viscous_damping, *hysteretic_damping]
        }
        Analysis::ComplexEigenvalue { eigenvalue, modal_a, modal_b, .. } => vec![
            eigenvalue.re, eigenvalue.im, modal_a.re, modal_a.im, modal_b.re, modal_b.im,
        ],
        Analysis::FrequencyResponse { frequency, .. } => vec![*frequency],
    }
}

fn analysis_number(analysis: &Analysis) -> i64 {
    match analysis {
        Analysis::NormalMode { mode, .. } | Analysis::ComplexEigenvalue { mode, .. } => *mode,
        Analysis::FrequencyResponse { step, .. } => *step,
    }
}

fn analysis_matches(analysis_type: i64, analysis: &Analysis) -> bool {
    matches!(
        (analysis_type, analysis),
        (ANALYSIS_NORMAL_MODE, Analysis::NormalMode { .. })
            | (ANALYSIS_COMPLEX | ANALYSIS_COMPLEX_ALT, Analysis::ComplexEigenvalue { .. })
            | (ANALYSIS_FREQUENCY, Analysis::FrequencyResponse { .. })
    )
}

pub struct NodalResponseCodec;

impl NodalResponseCodec {
    fn decode_analysis(analysis_type: i64, number: i64, reals: &[f64]) -> Result<Analysis, RecordError> {
        let r = |i: usize| reals.get(i).copied().unwrap_or(0.0);
        Ok(match analysis_type {
            ANALYSIS_NORMAL_MODE => Analysis::NormalMode {
                mode:               number,
                frequency:          r(0),
                modal_mass:         r(1),
                viscous_damping:    r(2),
                hysteretic_damping: r(3),
            },
            ANALYSIS_COMPLEX | ANALYSIS_COMPLEX_ALT => Analysis::ComplexEigenvalue {
                mode:       number,
                eigenvalue: Complex::new(r(0), r(1)),
                modal_a:    Complex::new(r(2), r(3)),
                modal_b:    Complex::new(r(4), r(5)),
            },
            ANALYSIS_FREQUENCY => Analysis::FrequencyResponse { step: number, frequency: r(0) },
            other => {
                return Err(RecordError::Unimplemented {
                    type_code: DatasetType::NodalResponse.code(),
                    what:      format!("analysis type {other}"),
                })
            }
        })
    }
}

impl DatasetCodec for NodalResponseCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::NodalResponse }

    fn decode(&self, block: &BlockView<'_>, warnings: &mut Vec<String>) -> Result<Record, RecordError> {
        let type_code = DatasetType::NodalResponse.code();
        let ids: [String; 5] = std::array::from_fn(|i| block.line_or_blank(i).full_text());

        let kind = block.line(ID_LINES)?;
        let field = |start| kind.int(start, 10).map_err(at_line(ID_LINES + 1));
        let model_type      = field(1)?;
        let analysis_type   = field(11)?;
        let data_character  = field(21)?;
        let response_type   = field(31)?;
        let data_type       = field(41)?;
        let values_per_node = field(51)?;

        if model_type != 1 {
            return Err(RecordError::Unimplemented {
                type_code,
                what: format!("model type {model_type}"),
            });
        }
        let width = reals_per_node(type_code, data_type, values_per_node)?;

        let ints = int_run([block.line(ID_LINES + 1)?]).map_err(at_line(ID_LINES + 2))?;
        let int_at = |i: usize| ints.get(i).copied().unwrap_or(0);
        let real_count = usize::try_from(int_at(1)).unwrap_or(0);
        let load_case  = int_at(2);
        let number     = int_at(3);

        let first_real = ID_LINES + 2;
        let real_lines = real_count.div_ceil(REALS_PER_LINE).max(1);
        let reals = float_run(block.lines_from(first_real).take(real_lines))
            .map_err(at_line(first_real + 1))?;
        let analysis = Self::decode_analysis(analysis_type, number, &reals)?;

        let first_node = first_real + real_lines;
        let node_lines = block.line_count().saturating_sub(first_node);
        if node_lines % 2 != 0 {
            warnings.push(format!(
                "dataset 55: ignoring an unpaired line after {} nodes",
                node_lines / 2
            ));
        }

        let count = node_lines / 2;
        let mut node_labels = Vec::with_capacity(count);
        let mut columns = vec![Vec::with_capacity(count); width];
        for k in 0..count {
            let line = first_node + 2 * k;
            let label = block.line(line)?.int(1, 10).map_err(at_line(line + 1))?;
            let values = float_run([block.line(line + 1)?]).map_err(at_line(line + 2))?;
            if values.len() < width {
                return Err(RecordError::InvalidData(format!(
                    "node {label}: expected {width} values, found {}",
                    values.len()
                )));
            }
            node_labels.push(label);
            for (column, v) in columns.iter_mut().zip(values) {
                column.push(v);
            }
        }

        let components = if data_type == DATA_COMPLEX {
            columns
                .chunks_exact(2)
                .map(|pair| {
                    Series::Complex(
                        pair[0].iter().zip(&pair[1]).map(|(&re, &im)| Complex::new(re, im)).collect(),
                    )
                })
                .collect()
        } else {
            columns.into_iter().map(Series::Real).collect()
        };

        Ok(Record::NodalResponse(NodalResponse {
            ids,
            model_type,
            analysis_type,
            data_character,
            response_type,
            data_type,
            values_per_node,
            load_case,
            analysis,
            node_labels,
            components,
        }))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::NodalResponse(r) = record else {
            return Err(wrong_record(DatasetType::NodalResponse, record));
        };
        let type_code = DatasetType::NodalResponse.code();
        reals_per_node(type_code, r.data_type, r.values_per_node)?;
        if !analysis_matches(r.analysis_type, &r.analysis) {
            return Err(RecordError::InvalidRecord(format!(
                "analysis type {} does not match the analysis parameters",
                r.analysis_type
            )));
        }
        let complex = r.data_type == DATA_COMPLEX;
        let n = r.node_labels.len();
        if r.components.len() as i64 != r.values_per_node
            || r.components.iter().any(|c| c.len() != n || c.is_complex() != complex)
        {
            return Err(RecordError::InvalidRecord(format!(
                "expected {} {} components of {n} values",
                r.values_per_node,
                if complex { "complex" } else { "real" }
            )));
        }

        ascii_header(DatasetType::NodalResponse, out);
        for id in &r.ids {
            out.line(id);
        }
        out.int(10, r.model_type)
            .int(10, r.analysis_type)
            .int(10, r.data_character)
            .int(10, r.response_type)
            .int(10, r.data_type)
            .int(10, r.values_per_node)
            .end();

        let reals = analysis_reals(&r.analysis);
        out.int(10, 2)
            .int(10, reals.len() as i64)
            .int(10, r.load_case)
            .int(10, analysis_number(&r.analysis))
            .end();
        let mut run = out.wrapped(REALS_PER_LINE);
        for v in reals {
            run.exp(13, 5, v);
        }
        run.finish();

        for (i, &label) in r.node_labels.iter().enumerate() {
            out.int(10, label).end();
            for component in &r.components {
                match component {
                    Series::Real(v) => {
                        out.exp(13, 5, v[i]);
                    }
                    Series::Complex(v) => {
                        out.exp(13, 5, v[i].re).exp(13, 5, v[i].im);
                    }
                }
            }
            out.end();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::testing::{decode_bytes, roundtrip};

    fn labels() -> Vec<i64> {
        vec![1, 2, 5]
    }

    #[test]
    fn normal_mode_roundtrip() {
        let record = Record::NodalResponse(NodalResponse {
            ids: ["mode 1".into(), "".into(), "".into(), "".into(), "".into()],
            load_case: 1,
            analysis: Analysis::NormalMode {
                mode:               1,
                frequency:          12.5,
                modal_mass:         1.0,
                viscous_damping:    0.015,
                hysteretic_damping: 0.0,
            },
            node_labels: labels(),
            components: vec![
                Series::Real(vec![0.5, -0.25, 1.0]),
                Series::Real(vec![0.0, 0.125, 2.0]),
                Series::Real(vec![1.5, 0.75, -3.0]),
            ],
            ..Default::default()
        });
        assert_eq!(roundtrip(&record), record);
    }

    #[test]
    fn six_reals_per_node() {
        let record = Record::NodalResponse(NodalResponse {
            values_per_node: 6,
            analysis_type: 5,
            analysis: Analysis::FrequencyResponse { step: 3, frequency: 100.0 },
            node_labels: vec![10],
            components: (1..=6).map(|v| Series::Real(vec![v as f64])).collect(),
            ..Default::default()
        });
        assert_eq!(roundtrip(&record), record);
    }

    #[test]
    fn complex_eigenvalue_roundtrip() {
        let c = Complex::new;
        let record = Record::NodalResponse(NodalResponse {
            analysis_type: 3,
            data_type: 5,
            analysis: Analysis::ComplexEigenvalue {
                mode:       2,
                eigenvalue: c(-1.5, 62.5),
                modal_a:    c(0.25, -0.5),
                modal_b:    c(4.0, 8.0),
            },
            node_labels: labels(),
            components: vec![
                Series::Complex(vec![c(1.0, 0.5), c(2.0, -0.5), c(0.0, 0.0)]),
                Series::Complex(vec![c(0.25, 0.0), c(-1.0, 1.0), c(3.0, 3.0)]),
                Series::Complex(vec![c(0.0, 1.0), c(0.0, -1.0), c(5.0, 0.125)]),
            ],
            ..Default::default()
        });
        assert_eq!(roundtrip(&record), record);
    }

    #[test]
    fn unsupported_shape_is_unimplemented() {
        let record = Record::NodalResponse(NodalResponse {
            data_type: 5,
            values_per_node: 6,
            ..Default::default()
        });
        let mut out = LineWriter::new();
        let err = NodalResponseCodec.encode(&record, &mut out).unwrap_err();
        assert_eq!(err.code(), 4);
    }

    #[test]
    fn model_type_must_be_structural() {
        let mut body = b"    55\n".to_vec();
        for _ in 0..5 {
            body.extend_from_slice(b"NONE\n");
        }
        body.extend_from_slice(b"         2         2         2         8         2         3\n");
        body.extend_from_slice(b"         2         1         1         1\n");
        body.extend_from_slice(b"  1.00000E+00\n");
        let (record, _) = decode_bytes(&body);
        assert_eq!(record.unwrap_err().code(), 4);
    }

    #[test]
    fn mismatched_components_are_rejected() {
        let record = Record::NodalResponse(NodalResponse {
            node_labels: labels(),
            components: vec![Series::Real(vec![1.0]); 3],
            ..Default::default()
        });
        let mut out = LineWriter::new();
        assert_eq!(NodalResponseCodec.encode(&record, &mut out).unwrap_err().code(), 7);
    }
}
