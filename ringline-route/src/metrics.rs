//! Routing metrics.

use metriken::{Counter, metric};

#[metric(
    name = "ringline/route/detached",
    description = "Fanout children left running after their parent replied"
)]
pub static DETACHED_CHILDREN: Counter = Counter::new();

#[metric(
    name = "ringline/route/dispatch_failures",
    description = "Fanouts that could not start because no executor was entered"
)]
pub static DISPATCH_FAILURES: Counter = Counter::new();
