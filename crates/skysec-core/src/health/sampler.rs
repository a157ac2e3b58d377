//! Host telemetry sampling
//!
//! `ProcSampler` reads `/proc/stat` and `/proc/meminfo`. CPU usage is the busy
//! share of jiffies since the previous sample, so the very first call reports
//! 0.0. Test code uses `FixedSampler` or `ScriptedSampler`.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::HealthError;

/// One CPU/memory reading, both as percentages in 0-100
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
}

impl HostSample {
    pub fn new(cpu_usage: f64, memory_usage: f64) -> Self {
        Self {
            cpu_usage: normalize_pct(cpu_usage),
            memory_usage: normalize_pct(memory_usage),
        }
    }
}

/// Source of host telemetry
pub trait HostSampler: Send {
    fn sample(&mut self) -> Result<HostSample, HealthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

/// Linux `/proc` sampler
#[derive(Debug)]
pub struct ProcSampler {
    stat_path: PathBuf,
    meminfo_path: PathBuf,
    previous: Option<CpuTimes>,
}

impl ProcSampler {
    pub fn new() -> Self {
        Self::with_paths("/proc/stat", "/proc/meminfo")
    }

    pub fn with_paths(stat_path: impl Into<PathBuf>, meminfo_path: impl Into<PathBuf>) -> Self {
        Self {
            stat_path: stat_path.into(),
            meminfo_path: meminfo_path.into(),
            previous: None,
        }
    }

    fn read(path: &Path) -> Result<String, HealthError> {
        fs::read_to_string(path)
            .map_err(|e| HealthError::sampling(format!("{}: {}", path.display(), e)))
    }
}

impl Default for ProcSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSampler for ProcSampler {
    fn sample(&mut self) -> Result<HostSample, HealthError> {
        let times = parse_cpu_times(&Self::read(&self.stat_path)?)?;
        let memory = parse_memory_pct(&Self::read(&self.meminfo_path)?)?;

        let cpu = match self.previous.replace(times) {
            Some(prev) => cpu_pct_between(prev, times),
            None => 0.0,
        };

        Ok(HostSample::new(round1(cpu), round1(memory)))
    }
}

/// Always returns the same reading
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub HostSample);

impl FixedSampler {
    pub fn new(cpu_usage: f64, memory_usage: f64) -> Self {
        Self(HostSample::new(cpu_usage, memory_usage))
    }
}

impl HostSampler for FixedSampler {
    fn sample(&mut self) -> Result<HostSample, HealthError> {
        Ok(self.0)
    }
}

/// Replays a queue of readings, repeating the last one once exhausted.
///
/// Readings can be pushed while the sampler is owned by an aggregator through
/// the shared handle returned by [`ScriptedSampler::handle`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedSampler {
    queue: std::sync::Arc<Mutex<VecDeque<HostSample>>>,
    last: Option<HostSample>,
}

impl ScriptedSampler {
    pub fn new(readings: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let sampler = Self::default();
        sampler.handle().extend(readings);
        sampler
    }

    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle(std::sync::Arc::clone(&self.queue))
    }
}

impl HostSampler for ScriptedSampler {
    fn sample(&mut self) -> Result<HostSample, HealthError> {
        let next = self
            .queue
            .lock()
            .map_err(|_| HealthError::sampling("script queue poisoned"))?
            .pop_front();

        match next.or(self.last) {
            Some(sample) => {
                self.last = Some(sample);
                Ok(sample)
            }
            None => Err(HealthError::sampling("no scripted readings")),
        }
    }
}

/// Shared handle for feeding a [`ScriptedSampler`]
#[derive(Debug, Clone)]
pub struct ScriptHandle(std::sync::Arc<Mutex<VecDeque<HostSample>>>);

impl ScriptHandle {
    pub fn push(&self, cpu_usage: f64, memory_usage: f64) {
        self.extend([(cpu_usage, memory_usage)]);
    }

    pub fn extend(&self, readings: impl IntoIterator<Item = (f64, f64)>) {
        if let Ok(mut queue) = self.0.lock() {
            queue.extend(readings.into_iter().map(|(c, m)| HostSample::new(c, m)));
        }
    }
}

fn normalize_pct(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn cpu_pct_between(prev: CpuTimes, now: CpuTimes) -> f64 {
    let total = now.total.saturating_sub(prev.total);
    if total == 0 {
        return 0.0;
    }
    let busy = now.busy.saturating_sub(prev.busy);
    busy as f64 / total as f64 * 100.0
}

fn parse_cpu_times(contents: &str) -> Result<CpuTimes, HealthError> {
    let line = contents
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| HealthError::sampling("aggregate cpu line missing in /proc/stat"))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .map(|f| {
            f.parse::<u64>()
                .map_err(|e| HealthError::sampling(format!("bad /proc/stat field {:?}: {}", f, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if fields.len() < 4 {
        return Err(HealthError::sampling("too few cpu fields in /proc/stat"));
    }

    // user nice system idle iowait irq softirq steal [guest guest_nice]
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total: u64 = fields.iter().take(8).sum();

    Ok(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

fn parse_memory_pct(contents: &str) -> Result<f64, HealthError> {
    let field = |name: &str| -> Result<u64, HealthError> {
        contents
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| HealthError::sampling(format!("{} missing in /proc/meminfo", name)))
    };

    let total = field("MemTotal")?;
    let available = field("MemAvailable")?;
    if total == 0 {
        return Err(HealthError::sampling("MemTotal is zero"));
    }

    Ok(total.saturating_sub(available) as f64 / total as f64 * 100.0)
}
