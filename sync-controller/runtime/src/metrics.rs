use crate::sync::SyncError;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{
        counter::Counter,
        family::Family,
        histogram::{exponential_buckets, Histogram},
    },
    registry::{Registry, Unit},
};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SyncMetrics {
    passes: Family<PassLabels, Counter>,
    failures: Family<FailureLabels, Counter>,
    duration: Family<ClusterLabels, Histogram>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct PassLabels {
    cluster: String,
    result: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct FailureLabels {
    cluster: String,
    kind: &'static str,
    op: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ClusterLabels {
    cluster: String,
}

// === impl SyncMetrics ===

impl SyncMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let passes = Family::<PassLabels, Counter>::default();
        reg.register(
            "passes",
            "Total number of sync passes by result",
            passes.clone(),
        );

        let failures = Family::<FailureLabels, Counter>::default();
        reg.register(
            "failures",
            "Total number of resources that failed to sync",
            failures.clone(),
        );

        let duration = Family::<ClusterLabels, Histogram>::new_with_constructor(|| {
            // 10ms to ~40s.
            Histogram::new(exponential_buckets(0.01, 2.0, 12))
        });
        reg.register_with_unit(
            "duration",
            "Histogram of sync pass durations",
            Unit::Seconds,
            duration.clone(),
        );

        Self {
            passes,
            failures,
            duration,
        }
    }

    pub fn observe(&self, cluster: &str, elapsed: Duration, error: Option<&SyncError>) {
        let result = match error {
            None => "success",
            Some(SyncError { failures }) => {
                for failure in failures {
                    self.failures
                        .get_or_create(&FailureLabels {
                            cluster: cluster.to_string(),
                            kind: failure.kind.as_str(),
                            op: failure.op.as_str(),
                        })
                        .inc();
                }
                "failure"
            }
        };
        self.passes
            .get_or_create(&PassLabels {
                cluster: cluster.to_string(),
                result,
            })
            .inc();
        self.duration
            .get_or_create(&ClusterLabels {
                cluster: cluster.to_string(),
            })
            .observe(elapsed.as_secs_f64());
    }
}
