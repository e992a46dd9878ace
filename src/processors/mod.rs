pub mod assembler;
pub mod derived_engine;
pub mod pipeline;
pub mod reducer;
pub mod report;
pub mod station_filter;

pub use assembler::{Assembly, AssemblyStats, ObservationAssembler, ObservationRequest, TimeWindow};
pub use derived_engine::{DeriveStats, DerivedQuantityEngine, Octant};
pub use pipeline::{Pipeline, PipelineInput, PipelineOutput};
pub use reducer::RecencyReducer;
pub use report::{ProcessingReport, CORE_PARAMETERS};
pub use station_filter::{find_center, StationFilter};
