//! Metrics collection module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Swap run metrics
pub struct Metrics {
    registry: Registry,

    // Counters
    pub runs_total: IntCounter,
    pub stages_total: IntCounterVec,
    pub outcomes_total: IntCounterVec,
    pub errors_total: IntCounterVec,

    // Histograms
    pub run_latency: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let runs_total =
            IntCounter::with_opts(Opts::new("swap_runs_total", "Total number of swap runs"))?;

        let stages_total = IntCounterVec::new(
            Opts::new("swap_stage_total", "Number of times each pipeline stage was reached"),
            &["stage"],
        )?;

        let outcomes_total = IntCounterVec::new(
            Opts::new("swap_outcomes_total", "Terminal outcomes of swap runs"),
            &["outcome"],
        )?;

        let errors_total = IntCounterVec::new(
            Opts::new("swap_errors_total", "Aborted swap runs by error category"),
            &["category"],
        )?;

        let run_latency = Histogram::with_opts(
            HistogramOpts::new("swap_run_latency_seconds", "Swap run latency")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(stages_total.clone()))?;
        registry.register(Box::new(outcomes_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(run_latency.clone()))?;

        Ok(Self {
            registry,
            runs_total,
            stages_total,
            outcomes_total,
            errors_total,
            run_latency,
        })
    }

    pub fn record_stage(&self, stage: &str) {
        self.stages_total.with_label_values(&[stage]).inc();
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.outcomes_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_error(&self, category: &str) {
        self.errors_total.with_label_values(&[category]).inc();
    }

    /// Prometheus text exposition of everything recorded so far
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}
