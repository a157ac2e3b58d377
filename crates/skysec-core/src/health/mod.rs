//! Health aggregation and readiness provenance
//!
//! Readiness is recomputed from scratch on every snapshot (level-triggered).
//! Only the retained [`TransitionRecord`] is edge-triggered: it is rewritten
//! when the readiness level or its cause string changes, and left alone
//! otherwise.

mod debounce;
mod registry;
mod sampler;

pub use debounce::*;
pub use registry::*;
pub use sampler::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HealthConfig;
use crate::error::Result;

const STARTUP_CAUSE: &str = "System Startup";
const NOMINAL_CAUSE: &str = "All Systems Nominal";
const MULTIPLE_CRITICAL_CAUSE: &str = "Multiple Critical Failures";
const PERFORMANCE_CAUSE: &str = "Performance Degraded";

/// Aggregate readiness tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Readiness {
    Ready,
    Degraded,
    NotReady,
}

impl Readiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Ready => "READY",
            Readiness::Degraded => "DEGRADED",
            Readiness::NotReady => "NOT_READY",
        }
    }

    /// Numeric severity, 0 for READY up to 2 for NOT_READY
    pub fn severity(&self) -> u8 {
        match self {
            Readiness::Ready => 0,
            Readiness::Degraded => 1,
            Readiness::NotReady => 2,
        }
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin side of a transition; `INIT` only appears in the startup record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionOrigin {
    Init,
    Ready,
    Degraded,
    NotReady,
}

impl From<Readiness> for TransitionOrigin {
    fn from(readiness: Readiness) -> Self {
        match readiness {
            Readiness::Ready => TransitionOrigin::Ready,
            Readiness::Degraded => TransitionOrigin::Degraded,
            Readiness::NotReady => TransitionOrigin::NotReady,
        }
    }
}

/// Most recent readiness change and why it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: TransitionOrigin,
    pub to: Readiness,
    pub cause: String,
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    fn startup(now: DateTime<Utc>) -> Self {
        Self {
            from: TransitionOrigin::Init,
            to: Readiness::Ready,
            cause: STARTUP_CAUSE.to_string(),
            timestamp: now,
        }
    }
}

/// Point-in-time health view served to the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub mode: &'static str,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub services: ServiceRegistry,
    pub readiness: Readiness,
    pub readiness_reasons: Vec<String>,
    pub last_transition: TransitionRecord,
    pub timestamp: DateTime<Utc>,
}

/// Readiness verdict for one sample, before provenance is applied
#[derive(Debug, Clone, PartialEq, Eq)]
struct Assessment {
    readiness: Readiness,
    cause: String,
    reasons: Vec<String>,
}

/// Owner of the service registry, debounce counters and transition record
pub struct HealthAggregator {
    registry: ServiceRegistry,
    cpu: DebounceCounter,
    memory: DebounceCounter,
    last_readiness: Readiness,
    last_cause: String,
    last_transition: TransitionRecord,
    sampler: Box<dyn HostSampler>,
}

impl HealthAggregator {
    /// Create an aggregator from configuration with the given host sampler
    pub fn new(config: &HealthConfig, sampler: Box<dyn HostSampler>) -> Self {
        let registry = config
            .services
            .iter()
            .map(|s| (s.name.clone(), s.critical))
            .collect();

        Self::with_registry(
            registry,
            DebounceCounter::new(config.cpu_threshold, config.debounce_limit),
            DebounceCounter::new(config.memory_threshold, config.debounce_limit),
            sampler,
        )
    }

    pub fn with_registry(
        registry: ServiceRegistry,
        cpu: DebounceCounter,
        memory: DebounceCounter,
        sampler: Box<dyn HostSampler>,
    ) -> Self {
        Self {
            registry,
            cpu,
            memory,
            last_readiness: Readiness::Ready,
            last_cause: STARTUP_CAUSE.to_string(),
            last_transition: TransitionRecord::startup(Utc::now()),
            sampler,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn cpu_counter(&self) -> DebounceCounter {
        self.cpu
    }

    pub fn memory_counter(&self) -> DebounceCounter {
        self.memory
    }

    pub fn last_transition(&self) -> &TransitionRecord {
        &self.last_transition
    }

    /// Set a service ONLINE or OFFLINE. Readiness is not recomputed until the
    /// next snapshot.
    pub fn toggle_service(&mut self, name: &str, active: bool) -> Result<ServiceStatus> {
        let status = self.registry.set_active(name, active)?;
        tracing::info!(service = %name, status = status.as_str(), "Service status toggled");
        Ok(status)
    }

    /// Take a snapshot stamped with the current time
    pub fn snapshot(&mut self) -> Result<HealthSnapshot> {
        self.snapshot_at(Utc::now())
    }

    /// Take a snapshot stamped with `now`.
    ///
    /// A sampling failure is returned before any counter or transition state
    /// is touched.
    pub fn snapshot_at(&mut self, now: DateTime<Utc>) -> Result<HealthSnapshot> {
        let sample = self.sampler.sample()?;

        self.cpu = self.cpu.observe(sample.cpu_usage);
        self.memory = self.memory.observe(sample.memory_usage);

        let assessment = self.assess(sample);
        self.record_transition(&assessment, now);

        Ok(HealthSnapshot {
            mode: "SIMULATION",
            cpu_usage: sample.cpu_usage,
            memory_usage: sample.memory_usage,
            services: self.registry.clone(),
            readiness: assessment.readiness,
            readiness_reasons: assessment.reasons,
            last_transition: self.last_transition.clone(),
            timestamp: now,
        })
    }

    fn assess(&self, sample: HostSample) -> Assessment {
        let (failed_critical, failed_services) = self.registry.failures();

        let mut degraded_reasons: Vec<String> = failed_services
            .iter()
            .map(|name| unavailable(name))
            .collect();

        let mut readiness = if !failed_critical.is_empty() {
            Readiness::NotReady
        } else if !failed_services.is_empty() {
            Readiness::Degraded
        } else {
            Readiness::Ready
        };

        for (metric, counter, value) in [
            (Metric::Cpu, self.cpu, sample.cpu_usage),
            (Metric::Memory, self.memory, sample.memory_usage),
        ] {
            if counter.is_tripped() {
                degraded_reasons.push(metric.critical_reason(value));
                if readiness != Readiness::NotReady {
                    readiness = Readiness::Degraded;
                }
            }
        }

        let cause = match readiness {
            Readiness::NotReady => match failed_critical.as_slice() {
                [only] => unavailable(only),
                _ => MULTIPLE_CRITICAL_CAUSE.to_string(),
            },
            Readiness::Degraded => degraded_reasons
                .first()
                .cloned()
                .unwrap_or_else(|| PERFORMANCE_CAUSE.to_string()),
            Readiness::Ready => NOMINAL_CAUSE.to_string(),
        };

        let reasons = failed_critical
            .iter()
            .map(|name| unavailable(name))
            .chain(degraded_reasons)
            .collect();

        Assessment {
            readiness,
            cause,
            reasons,
        }
    }

    fn record_transition(&mut self, assessment: &Assessment, now: DateTime<Utc>) {
        if assessment.readiness == self.last_readiness && assessment.cause == self.last_cause {
            return;
        }

        self.last_transition = TransitionRecord {
            from: self.last_readiness.into(),
            to: assessment.readiness,
            cause: assessment.cause.clone(),
            timestamp: now,
        };

        if assessment.readiness.severity() > self.last_readiness.severity() {
            tracing::warn!(
                from = %self.last_readiness,
                to = %assessment.readiness,
                cause = %assessment.cause,
                "Readiness degraded"
            );
        } else {
            tracing::info!(
                from = %self.last_readiness,
                to = %assessment.readiness,
                cause = %assessment.cause,
                "Readiness transition"
            );
        }

        self.last_readiness = assessment.readiness;
        self.last_cause = assessment.cause.clone();
    }
}

impl std::fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthAggregator")
            .field("registry", &self.registry)
            .field("cpu", &self.cpu)
            .field("memory", &self.memory)
            .field("last_readiness", &self.last_readiness)
            .field("last_cause", &self.last_cause)
            .field("last_transition", &self.last_transition)
            .finish_non_exhaustive()
    }
}

fn unavailable(name: &str) -> String {
    format!("{} unavailable", name)
}
