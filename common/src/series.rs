use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub item_count: i64,
    pub time: f64,
}

impl Sample {
    pub fn new(item_count: i64, time: f64) -> Self {
        Self { item_count, time }
    }
}

/// A labelled run of samples, kept in the order they were read.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub label: String,
    pub samples: Vec<Sample>,
}

impl NamedSeries {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            samples: Vec::new(),
        }
    }

    pub fn with_samples(label: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            label: label.into(),
            samples,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns a copy with every time multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            label: self.label.clone(),
            samples: self
                .samples
                .iter()
                .map(|s| Sample::new(s.item_count, s.time * factor))
                .collect(),
        }
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + Clone + '_ {
        self.samples.iter().map(|s| (s.item_count as f64, s.time))
    }
}
