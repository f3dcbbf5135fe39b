//! Type 2412: finite elements.
//!
//! The block is read as one flat integer run.  Each element starts with six
//! fields (label, FE descriptor, physical property, material property, color,
//! node count).  Beam-like descriptors carry three more fields (orientation
//! node, fore-end and aft-end cross section) before the node labels.

use super::{ascii_header, at_line, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::field::{int_run, LineWriter};
use crate::record::{Element, Record};

/// FE descriptor ids whose elements carry a beam orientation record.
pub const BEAM_DESCRIPTORS: [i64; 9] = [11, 21, 22, 23, 24, 31, 32, 121, 122];

const NODES_PER_LINE: usize = 8;

fn is_beam(fe_descriptor: i64) -> bool {
    BEAM_DESCRIPTORS.contains(&fe_descriptor)
}

pub struct ElementsCodec;

impl DatasetCodec for ElementsCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::Elements }

    fn decode(&self, block: &BlockView<'_>, warnings: &mut Vec<String>) -> Result<Record, RecordError> {
        let values = int_run(block.lines_from(0)).map_err(at_line(1))?;
        let mut elements = Vec::new();
        let mut rest = values.as_slice();

        while !rest.is_empty() {
            if rest.len() < 6 {
                warnings.push(format!(
                    "dataset 2412: ignoring {} trailing values after element {}",
                    rest.len(),
                    elements.len()
                ));
                break;
            }
            let (head, tail) = rest.split_at(6);
            rest = tail;

            let mut beam = [0i64; 3];
            if is_beam(head[1]) {
                if rest.len() < 3 {
                    return Err(truncated(head[0]));
                }
                beam.copy_from_slice(&rest[..3]);
                rest = &rest[3..];
            }

            let count = usize::try_from(head[5]).map_err(|_| {
                RecordError::InvalidData(format!("element {}: node count {}", head[0], head[5]))
            })?;
            if rest.len() < count {
                return Err(truncated(head[0]));
            }
            let (nodes, tail) = rest.split_at(count);
            rest = tail;

            elements.push(Element {
                label:             head[0],
                fe_descriptor:     head[1],
                physical_property: head[2],
                material_property: head[3],
                color:             head[4],
                beam,
                nodes:             nodes.to_vec(),
            });
        }
        Ok(Record::Elements(elements))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::Elements(elements) = record else {
            return Err(wrong_record(DatasetType::Elements, record));
        };
        ascii_header(DatasetType::Elements, out);
        for e in elements {
            out.int(10, e.label)
                .int(10, e.fe_descriptor)
                .int(10, e.physical_property)
                .int(10, e.material_property)
                .int(10, e.color)
                .int(10, e.nodes.len() as i64)
                .end();
            if is_beam(e.fe_descriptor) {
                out.int(10, e.beam[0]).int(10, e.beam[1]).int(10, e.beam[2]).end();
            }
            let mut labels = out.wrapped(NODES_PER_LINE);
            for &n in &e.nodes {
                labels.int(10, n);
            }
            labels.finish();
        }
        Ok(())
    }
}

fn truncated(label: i64) -> RecordError {
    RecordError::InvalidData(format!("element {label}: connectivity is truncated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::testing::{decode_bytes, roundtrip};

    fn shell(label: i64, nodes: Vec<i64>) -> Element {
        Element {
            label,
            fe_descriptor:     94,
            physical_property: 1,
            material_property: 1,
            color:             7,
            nodes,
            ..Default::default()
        }
    }

    #[test]
    fn mixed_mesh_roundtrip() {
        let record = Record::Elements(vec![
            Element {
                label:             1,
                fe_descriptor:     21,
                physical_property: 1,
                material_property: 1,
                color:             7,
                beam:              [0, 1, 1],
                nodes:             vec![1, 2],
            },
            shell(2, vec![1, 2, 3, 4]),
            shell(3, (10..30).collect()),
        ]);
        assert_eq!(roundtrip(&record), record);
    }

    #[test]
    fn beam_set_is_fixed() {
        for d in BEAM_DESCRIPTORS {
            assert!(is_beam(d));
        }
        assert!(!is_beam(94));
        assert!(!is_beam(111));
    }

    #[test]
    fn truncated_connectivity() {
        let body = b"  2412\n         1        94         1         1         7         4\n         1         2\n";
        let (record, _) = decode_bytes(body);
        assert_eq!(record.unwrap_err().code(), 6);
    }
}
