pub mod derived;
pub mod observation;
pub mod station;

pub use derived::{DerivedDataset, DerivedRecord};
pub use observation::{
    AssembledRecord, FieldValue, ObservationEntry, ParameterKind, ReconciledRecord,
    StructuredEntry, WindDirection,
};
pub use station::StationMetadata;
