use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::info;

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub duration: Duration,
    pub count: u32,
}

/// Per-stage durations accumulated over a whole run. Repeated stages (one
/// `match_stereo` per pair, for instance) fold into a single entry.
#[derive(Debug, Default, Clone)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
    index: HashMap<String, usize>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => {
                let step = &mut self.steps[i];
                step.duration += duration;
                step.count += 1;
            }
            None => {
                self.index.insert(name.clone(), self.steps.len());
                self.steps.push(StepTiming { name, duration, count: 1 });
            }
        }
    }

    /// Runs `f`, recording its wall time under `name`.
    pub fn measure<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let timer = Timer::start(name);
        let out = f();
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
        out
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<&StepTiming> {
        self.index.get(name).map(|&i| &self.steps[i])
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn log_summary(&self) {
        let total = self.total_duration().as_secs_f64();
        for step in &self.steps {
            let share = if total > 0.0 {
                step.duration.as_secs_f64() / total * 100.0
            } else {
                0.0
            };
            info!(
                step = %step.name,
                calls = step.count,
                total_ms = step.duration.as_secs_f64() * 1000.0,
                share_pct = share,
                "Stage timing"
            );
        }
        info!(total_ms = total * 1000.0, "Pipeline total");
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}
