//! Import/export-corrected fuel mix and carbon intensity.

pub mod attribution;
pub mod consumption;
pub mod intensity;
pub mod pipeline;

pub use attribution::{attribute, attribute_with_mix, fuel_mix_shares};
pub use consumption::{reconcile, supply_demand_by_clock_hour};
pub use intensity::{aggregate_by_clock_hour, aggregate_hourly, summarize, ClockHourWeighting};
pub use pipeline::{GridMixPipeline, PipelineSettings, UsageBreakdown};
