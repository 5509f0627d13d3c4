use crate::error::Result;
use crate::module::spec::Config;
use crate::module::{ModuleOp, Prepare};
use crate::payload::Value;
use crate::signal::AnySignal;

/// Observation-only module: logs its inputs once per response.
///
/// It has no outputs and no sensitivity rule. Every value seen is kept in
/// [`history`](IterationLog::history), one series per input.
#[derive(Debug, Clone, Default)]
pub struct IterationLog {
    label: String,
    // Tags of the wired inputs, filled when the module is bound
    tags: Vec<String>,
    iter: usize,
    history: Vec<Vec<f64>>,
    min: Option<f64>,
    max: Option<f64>,
}

impl IterationLog {
    pub fn new(label: impl Into<String>) -> Self {
        IterationLog {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Number of responses logged so far.
    pub fn iterations(&self) -> usize {
        self.iter
    }

    /// Tags of the inputs being logged.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// All values seen per input, in order.
    pub fn history(&self) -> &[Vec<f64>] {
        &self.history
    }

    /// Smallest and largest value seen over all inputs.
    pub fn limits(&self) -> Option<(f64, f64)> {
        self.min.zip(self.max)
    }
}

impl Prepare for IterationLog {
    const NAME: &'static str = "IterationLog";

    fn prepare(config: &Config) -> Result<Self> {
        Ok(IterationLog::new(config.get_str("label")?.unwrap_or("iteration")))
    }
}

impl ModuleOp for IterationLog {
    fn response(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        if self.history.len() < inputs.len() {
            self.history.resize(inputs.len(), Vec::new());
        }
        for (i, x) in inputs.iter().enumerate() {
            let values = x.flat()?;
            let tag = self.tags.get(i).map_or("?", String::as_str);
            log::info!("[{}] iteration {}: {} = {:?}", self.label, self.iter, tag, values);
            for &v in &values {
                self.min = Some(self.min.map_or(v, |m| m.min(v)));
                self.max = Some(self.max.map_or(v, |m| m.max(v)));
            }
            self.history[i].extend(values);
        }
        self.iter += 1;
        Ok(Vec::new())
    }

    fn bind(&mut self, sig_in: &[AnySignal], _sig_out: &[AnySignal]) {
        self.tags = sig_in.iter().map(AnySignal::tag).collect();
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

crate::register_module!(IterationLog);

#[cfg(test)]
#[path = "iteration_log_test.rs"]
mod tests;
