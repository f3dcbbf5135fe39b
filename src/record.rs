//! Typed records, one struct per dataset layout.
//!
//! Every field is always present.  Values a caller does not care about keep
//! the [`Default`] of their struct, which doubles as the encoder's default
//! table: numbers 0, strings empty, plus the handful of non-zero defaults
//! documented on the struct that carries them.

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetType;

// ── Shared value types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// A run of real or complex samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Series {
    Real(Vec<f64>),
    Complex(Vec<Complex>),
}

impl Default for Series {
    fn default() -> Self {
        Series::Real(Vec::new())
    }
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Real(v)    => v.len(),
            Series::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Series::Complex(_))
    }
}

/// Numeric precision of a measurement on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Precision {
    Single,
    #[default]
    Double,
}

/// Byte order of a binary payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Envelope code: 1 little endian, 2 big endian.
    pub fn code(self) -> i64 {
        match self {
            Endian::Little => 1,
            Endian::Big    => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Endian::Little),
            2 => Some(Endian::Big),
            _ => None,
        }
    }
}

// ── 151: file header ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileHeader {
    pub model_name:   String,
    pub description:  String,
    pub db_app:       String,
    pub date_created: String,
    pub time_created: String,
    pub db_version:   [i64; 2],
    pub file_type:    i64,
    pub date_saved:   String,
    pub time_saved:   String,
    pub program:      String,
    /// Filled with the write time when empty.
    pub date_written: String,
    pub time_written: String,
}

// ── 164: units ───────────────────────────────────────────────────────────────

/// Unit system.  Defaults: temperature mode 1 (absolute), unit factors 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Units {
    pub code:               i64,
    pub description:        String,
    /// 1 absolute, 2 relative.
    pub temperature_mode:   i64,
    pub length:             f64,
    pub force:              f64,
    pub temperature:        f64,
    pub temperature_offset: f64,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            code:               1,
            description:        String::new(),
            temperature_mode:   1,
            length:             1.0,
            force:              1.0,
            temperature:        1.0,
            temperature_offset: 0.0,
        }
    }
}

// ── 15 / 2411: nodes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    pub label:   i64,
    /// Definition coordinate system (export CS for 2411).
    pub def_cs:  i64,
    pub disp_cs: i64,
    pub color:   i64,
    pub coords:  [f64; 3],
}

impl Node {
    pub fn new(label: i64, coords: [f64; 3]) -> Self {
        Self { label, coords, ..Self::default() }
    }
}

// ── 18: coordinate systems ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub number:    i64,
    /// 0 cartesian, 1 cylindrical, 2 spherical.
    pub cs_type:   i64,
    pub reference: i64,
    pub color:     i64,
    pub method:    i64,
    pub name:      String,
    pub origin:    [f64; 3],
    /// Point on the +X axis.
    pub x_point:   [f64; 3],
    /// Point in the +XZ plane.
    pub xz_point:  [f64; 3],
}

// ── 82: trace lines ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraceLine {
    pub number: i64,
    pub color:  i64,
    pub id:     String,
    /// Polyline node labels; 0 lifts the pen.
    pub nodes:  Vec<i64>,
}

// ── 2412: elements ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    pub label:             i64,
    pub fe_descriptor:     i64,
    pub physical_property: i64,
    pub material_property: i64,
    pub color:             i64,
    /// Orientation node, fore-end and aft-end cross sections.  Only written
    /// for beam-like descriptors; zero otherwise.
    pub beam:              [i64; 3],
    pub nodes:             Vec<i64>,
}

// ── 55: data at nodes ────────────────────────────────────────────────────────

/// Analysis-specific parameters of a type-55 record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Analysis {
    NormalMode {
        mode:               i64,
        frequency:          f64,
        modal_mass:         f64,
        viscous_damping:    f64,
        hysteretic_damping: f64,
    },
    ComplexEigenvalue {
        mode:       i64,
        eigenvalue: Complex,
        modal_a:    Complex,
        modal_b:    Complex,
    },
    FrequencyResponse {
        step:      i64,
        frequency: f64,
    },
}

impl Default for Analysis {
    fn default() -> Self {
        Analysis::NormalMode {
            mode:               1,
            frequency:          0.0,
            modal_mass:         0.0,
            viscous_damping:    0.0,
            hysteretic_damping: 0.0,
        }
    }
}

/// Response values at nodes.  Defaults: model type 1, analysis type 2,
/// data type 2 (real), 3 values per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodalResponse {
    pub ids:             [String; 5],
    pub model_type:      i64,
    /// 2 normal mode, 3 or 7 complex eigenvalue, 5 frequency response.
    pub analysis_type:   i64,
    pub data_character:  i64,
    pub response_type:   i64,
    /// 2 real, 5 complex.
    pub data_type:       i64,
    pub values_per_node: i64,
    pub load_case:       i64,
    pub analysis:        Analysis,
    pub node_labels:     Vec<i64>,
    /// One series per value slot (r1..r3 or r1..r6), each `node_labels.len()` long.
    pub components:      Vec<Series>,
}

impl Default for NodalResponse {
    fn default() -> Self {
        Self {
            ids:             Default::default(),
            model_type:      1,
            analysis_type:   2,
            data_character:  2,
            response_type:   8,
            data_type:       2,
            values_per_node: 3,
            load_case:       0,
            analysis:        Analysis::default(),
            node_labels:     Vec::new(),
            components:      Vec::new(),
        }
    }
}

// ── 58: function at a DOF ────────────────────────────────────────────────────

/// Axis descriptor (lines 8-11 of a measurement).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Axis {
    pub data_type:    i64,
    pub length_exp:   i64,
    pub force_exp:    i64,
    pub temp_exp:     i64,
    pub label:        String,
    pub units:        String,
}

/// Measured function.  Defaults: double precision, little endian, ASCII.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
    pub ids:                 [String; 5],
    pub function_type:       i64,
    pub function_id:         i64,
    pub version:             i64,
    pub load_case:           i64,
    pub response_entity:     String,
    pub response_node:       i64,
    pub response_direction:  i64,
    pub reference_entity:    String,
    pub reference_node:      i64,
    pub reference_direction: i64,
    pub abscissa_min:        f64,
    pub abscissa_inc:        f64,
    pub z_value:             f64,
    pub abscissa:            Axis,
    pub ordinate_num:        Axis,
    pub ordinate_den:        Axis,
    pub z_axis:              Axis,
    pub x:                   Vec<f64>,
    pub data:                Series,
    pub precision:           Precision,
    pub binary:              bool,
    pub endian:              Endian,
}

impl Measurement {
    /// A measurement on an even abscissa `xmin + i·dx`.
    pub fn even(abscissa_min: f64, abscissa_inc: f64, data: Series) -> Self {
        let x = (0..data.len()).map(|i| abscissa_min + i as f64 * abscissa_inc).collect();
        Self { abscissa_min, abscissa_inc, x, data, ..Self::default() }
    }

    /// A measurement with explicit abscissa values.
    pub fn uneven(x: Vec<f64>, data: Series) -> Self {
        let abscissa_min = x.first().copied().unwrap_or(0.0);
        Self { abscissa_min, x, data, ..Self::default() }
    }
}

// ── 1858: measurement qualifiers (write-only) ─────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurementQualifiers {
    pub set_record:             i64,
    pub octave_format:          i64,
    pub measurement_run:        i64,
    pub weighting:              i64,
    pub window:                 i64,
    pub amplitude_units:        i64,
    pub normalization:          i64,
    pub abscissa_qualifier:     i64,
    pub ordinate_num_qualifier: i64,
    pub ordinate_den_qualifier: i64,
    pub z_qualifier:            i64,
    pub sampling_type:          i64,
    pub z_rpm:                  f64,
    pub z_time:                 f64,
    pub z_order:                f64,
    pub sample_count:           f64,
    pub user_values:            [f64; 4],
    pub exponential_damping:    f64,
    pub response_direction:     String,
    pub reference_direction:    String,
}

// ── 1860: transducer (write-only) ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transducer {
    pub record_number:       i64,
    pub node:                i64,
    pub direction:           i64,
    pub model:               String,
    pub serial:              String,
    pub sensitivity:         f64,
    pub reference_frequency: f64,
    pub excitation:          f64,
    pub data_type:           i64,
    pub length_exp:          i64,
    pub force_exp:           i64,
    pub temp_exp:            i64,
    pub units:               String,
}

// ── 2420: coordinate system matrices (write-only) ─────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinateMatrix {
    pub label:    i64,
    pub cs_type:  i64,
    pub color:    i64,
    pub name:     String,
    pub rotation: [[f64; 3]; 3],
    pub origin:   [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinateMatrices {
    pub part_uid:  i64,
    pub part_name: String,
    pub systems:   Vec<CoordinateMatrix>,
}

// ── Record ───────────────────────────────────────────────────────────────────

/// One decoded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    FileHeader(FileHeader),
    Units(Units),
    Nodes(Vec<Node>),
    DoubleNodes(Vec<Node>),
    CoordinateSystems(Vec<CoordinateSystem>),
    TraceLine(TraceLine),
    Elements(Vec<Element>),
    NodalResponse(NodalResponse),
    Measurement(Measurement),
    MeasurementQualifiers(MeasurementQualifiers),
    Transducer(Transducer),
    CoordinateMatrices(CoordinateMatrices),
    /// Block with a type code this crate cannot decode.
    Unsupported { type_code: u32, binary: bool },
    /// Block of a known type whose decode failed; the reason is in the report.
    Undecoded { type_code: u32, binary: bool },
}

impl Record {
    pub fn type_code(&self) -> u32 {
        match self {
            Record::Unsupported { type_code, .. } | Record::Undecoded { type_code, .. } => {
                *type_code
            }
            other => other.dataset_type().map(DatasetType::code).unwrap_or(0),
        }
    }

    /// The dataset layout this record encodes to.
    pub fn dataset_type(&self) -> Option<DatasetType> {
        Some(match self {
            Record::FileHeader(_)            => DatasetType::FileHeader,
            Record::Units(_)                 => DatasetType::Units,
            Record::Nodes(_)                 => DatasetType::Nodes,
            Record::DoubleNodes(_)           => DatasetType::DoubleNodes,
            Record::CoordinateSystems(_)     => DatasetType::CoordinateSystems,
            Record::TraceLine(_)             => DatasetType::TraceLine,
            Record::Elements(_)              => DatasetType::Elements,
            Record::NodalResponse(_)         => DatasetType::NodalResponse,
            Record::Measurement(_)           => DatasetType::Measurement,
            Record::MeasurementQualifiers(_) => DatasetType::MeasurementQualifiers,
            Record::Transducer(_)            => DatasetType::Transducer,
            Record::CoordinateMatrices(_)    => DatasetType::CoordinateMatrices,
            Record::Unsupported { .. } | Record::Undecoded { .. } => return None,
        })
    }

    pub fn is_binary(&self) -> bool {
        match self {
            Record::Measurement(m) => m.binary,
            Record::Unsupported { binary, .. } | Record::Undecoded { binary, .. } => *binary,
            _ => false,
        }
    }

    /// True for the two payload-less slot variants.
    pub fn is_empty_slot(&self) -> bool {
        matches!(self, Record::Unsupported { .. } | Record::Undecoded { .. })
    }
}
