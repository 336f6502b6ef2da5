mod dispatch;
mod plan;

pub use dispatch::run;
pub use plan::{QueryOptions, QueryPlan, plan};
