//! `routeplan-recon`: customer identity matching between a planning workbook
//! and a system export, partitioned by route.
//!
//! Pure engine crate: receives pre-loaded names and tables, returns classified
//! results, rollups and change logs. No CLI or file IO dependencies.

pub mod aggregate;
pub mod apply;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod scorer;

pub use apply::{ApplyOptions, ApplyPlan, Dataset};
pub use config::{ReconConfig, Thresholds};
pub use engine::{run, MatchRun};
pub use error::ReconError;
pub use model::{
    Action, ChangeAction, ChangeLogEntry, Confidence, CustomerRecord, MatchResult, MatchStats, RouteCounts,
    RouteKey, RouteTable, Shift, Site, Snapshot, Source,
};
pub use normalize::{base_name, normalize};
pub use scorer::{Scorer, ScorerKind};
