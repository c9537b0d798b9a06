use crate::report::SensorReport;

/// Which averaged quantity an accumulator tracks. Door sensors are never
/// accumulated; their state lives in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementKind {
    Temperature,
    Humidity,
}

impl MeasurementKind {
    fn label(&self) -> &'static str {
        match self {
            MeasurementKind::Temperature => "Temperature",
            MeasurementKind::Humidity => "Humidity",
        }
    }
}

/// Running totals for one sensor across a single drain pass.
///
/// Transient: created on the sensor's first reading, discarded once the
/// report is built. `count` always equals the number of readings folded in.
#[derive(Debug)]
pub struct SensorAccumulator {
    kind: MeasurementKind,
    sum: f64,
    count: u32,
    violations: Vec<String>,
}

impl SensorAccumulator {
    pub fn new(kind: MeasurementKind) -> Self {
        Self {
            kind,
            sum: 0.0,
            count: 0,
            violations: Vec::new(),
        }
    }

    /// Fold one reading into the running totals, checking it against the
    /// thresholds resolved at classification time.
    pub fn record(&mut self, value: f64, max_threshold: Option<f64>, min_threshold: Option<f64>) {
        self.count += 1;
        self.sum += value;

        if let Some(max) = max_threshold {
            if value > max {
                self.violations.push(format!(
                    "{} {} exceeded maximum threshold {}.",
                    self.kind.label(),
                    value,
                    max
                ));
            }
        }
        if let Some(min) = min_threshold {
            if value < min {
                self.violations.push(format!(
                    "{} {} fell below minimum threshold {}.",
                    self.kind.label(),
                    value,
                    min
                ));
            }
        }
    }

    /// Finalize into a report entry. The average is only computed when at
    /// least one reading was folded in; an untouched accumulator yields
    /// nothing.
    pub fn finalize(self) -> Option<SensorReport> {
        if self.count == 0 {
            return None;
        }
        let average = round2(self.sum / f64::from(self.count));

        Some(match self.kind {
            MeasurementKind::Temperature => SensorReport::Temperature {
                value: average,
                count: self.count,
                violations: self.violations,
            },
            MeasurementKind::Humidity => SensorReport::Humidity {
                value: average,
                count: self.count,
                violations: self.violations,
            },
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
