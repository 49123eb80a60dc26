//! Metric family values produced by the mapper.

/// One labelled observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label values, positionally matching [`MetricFamily::labels`].
    pub labels: Vec<String>,
    pub value: f64,
}

/// A named gauge with a fixed label set and any number of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub labels: Vec<String>,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            samples: Vec::new(),
        }
    }

    /// Append a sample. `values` must line up with the family's labels.
    pub fn add_sample(&mut self, values: Vec<String>, value: f64) {
        debug_assert_eq!(
            values.len(),
            self.labels.len(),
            "label arity mismatch for {}",
            self.name
        );
        self.samples.push(Sample {
            labels: values,
            value,
        });
    }

    /// Value of a label on a sample, by label name.
    pub fn label<'a>(&self, sample: &'a Sample, name: &str) -> Option<&'a str> {
        self.labels
            .iter()
            .position(|l| l == name)
            .and_then(|i| sample.labels.get(i))
            .map(String::as_str)
    }

    /// First sample whose `label` equals `value`.
    pub fn find(&self, label: &str, value: &str) -> Option<&Sample> {
        self.samples
            .iter()
            .find(|s| self.label(s, label) == Some(value))
    }
}
