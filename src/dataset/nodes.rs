//! Types 15 and 2411: node coordinates.
//!
//! Both layouts hold the same seven values per node (label, definition CS,
//! displacement CS, color, x, y, z).  Type 15 packs them on one line with
//! single-precision coordinates; type 2411 splits them over two lines with
//! double-precision coordinates.  Reads ignore line boundaries and consume a
//! flat numeric run in groups of seven.

use super::{ascii_header, at_line, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::field::{float_run, LineWriter};
use crate::record::{Node, Record};

const VALUES_PER_NODE: usize = 7;

pub struct NodesCodec {
    double: bool,
}

impl NodesCodec {
    /// Type 15.
    pub fn single() -> Self {
        Self { double: false }
    }

    /// Type 2411.
    pub fn double() -> Self {
        Self { double: true }
    }
}

impl DatasetCodec for NodesCodec {
    fn dataset_type(&self) -> DatasetType {
        if self.double { DatasetType::DoubleNodes } else { DatasetType::Nodes }
    }

    fn decode(&self, block: &BlockView<'_>, warnings: &mut Vec<String>) -> Result<Record, RecordError> {
        let values = float_run(block.lines_from(0)).map_err(at_line(1))?;
        let leftover = values.len() % VALUES_PER_NODE;
        if leftover != 0 {
            warnings.push(format!(
                "dataset {}: ignoring {leftover} trailing values after the last complete node",
                self.dataset_type().code()
            ));
        }

        let nodes: Vec<Node> = values
            .chunks_exact(VALUES_PER_NODE)
            .map(|v| Node {
                label:   v[0] as i64,
                def_cs:  v[1] as i64,
                disp_cs: v[2] as i64,
                color:   v[3] as i64,
                coords:  [v[4], v[5], v[6]],
            })
            .collect();

        Ok(if self.double { Record::DoubleNodes(nodes) } else { Record::Nodes(nodes) })
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let nodes = match (record, self.double) {
            (Record::Nodes(n), false) | (Record::DoubleNodes(n), true) => n,
            _ => return Err(wrong_record(self.dataset_type(), record)),
        };
        ascii_header(self.dataset_type(), out);
        for node in nodes {
            out.int(10, node.label)
                .int(10, node.def_cs)
                .int(10, node.disp_cs)
                .int(10, node.color);
            if self.double {
                out.end();
                for c in node.coords {
                    out.dexp(25, 16, c);
                }
            } else {
                for c in node.coords {
                    out.exp(13, 5, c);
                }
            }
            out.end();
        }
        Ok(())
    }
}
