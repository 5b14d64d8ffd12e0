pub mod config;
pub mod cycle;
pub mod depth;
pub mod dispatcher;
pub mod graph;
pub mod orchestrator;
pub mod report;

pub use config::{BfSettings, ConfigError, DispatcherSettings, EngineConfig, RunMode, TriSettings};
pub use cycle::{detect_bf_cycles, detect_triangular, BfConfig, Cycle, TriConfig, TriOpportunity};
pub use depth::{revalidate, DepthError, DepthRevalidation, DepthRevalidatorConfig, HopWalk};
pub use dispatcher::{Dispatcher, DispatchFailure, DispatchSkip, DispatcherVenueConfig, VenueDispatcher, WorkerPool};
pub use graph::{build_rate_graph, usable_rate, Edge, GraphBuilderConfig, GraphError, RateGraph};
pub use orchestrator::{Engine, EngineCommand, EngineError, EngineLego};
pub use report::{
    format_path, BfRow, CsvReportSink, NullReportSink, PersistenceRow, ReportError, ReportSink,
    SimulationRow, TriRow,
};
