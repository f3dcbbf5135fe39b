//! Type 82: trace line (display sequence).

use super::{ascii_header, at_line, wrong_record, BlockView, DatasetCodec, DatasetType, RecordError};
use crate::field::{int_run, LineWriter};
use crate::record::{Record, TraceLine};

const NODES_PER_LINE: usize = 8;

pub struct TraceLineCodec;

impl DatasetCodec for TraceLineCodec {
    fn dataset_type(&self) -> DatasetType { DatasetType::TraceLine }

    fn decode(&self, block: &BlockView<'_>, warnings: &mut Vec<String>) -> Result<Record, RecordError> {
        let first = block.line(0)?;
        let number   = first.int(1, 10).map_err(at_line(1))?;
        let declared = first.int(11, 10).map_err(at_line(1))?;
        let color    = first.int(21, 10).map_err(at_line(1))?;
        let id = block.line_or_blank(1).full_text();

        let mut nodes = int_run(block.lines_from(2)).map_err(at_line(3))?;
        let declared = usize::try_from(declared).unwrap_or(0);
        if nodes.len() < declared {
            warnings.push(format!(
                "trace line {number}: {declared} nodes declared, {} found",
                nodes.len()
            ));
        }
        nodes.truncate(declared);

        Ok(Record::TraceLine(TraceLine { number, color, id, nodes }))
    }

    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError> {
        let Record::TraceLine(t) = record else {
            return Err(wrong_record(DatasetType::TraceLine, record));
        };
        ascii_header(DatasetType::TraceLine, out);
        out.int(10, t.number).int(10, t.nodes.len() as i64).int(10, t.color).end();
        out.line(&t.id);
        let mut labels = out.wrapped(NODES_PER_LINE);
        for &n in &t.nodes {
            labels.int(10, n);
        }
        labels.finish();
        Ok(())
    }
}
