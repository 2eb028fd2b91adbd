pub mod set_record;
pub mod suggestion;
pub mod trend;

pub use set_record::{NewSetRecord, SetRecord};
pub use suggestion::{
  AnalysisOutcome, CueSource, EnrichedSuggestion, ExerciseAnalysis, OverloadSuggestion, Recommendation,
};
pub use trend::{ExerciseTrend, RollingWindowSummary, Session, TrendMetrics};
