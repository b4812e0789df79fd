use coldchain_domain::SensorReading;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Summary statistics over the retained readings.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReadingStats {
    pub count: usize,
    pub average_temperature: f64,
    pub average_humidity: f64,
    pub active_sensors: usize,
    pub latest_event: Option<SensorReading>,
}

/// Bounded in-memory log of recent sensor readings, shared between the
/// subscriber task and the HTTP read endpoints. Readers get copies.
pub struct ReadingLog {
    readings: RwLock<VecDeque<SensorReading>>,
    max_size: usize,
}

impl ReadingLog {
    pub fn new(max_size: usize) -> Self {
        Self {
            readings: RwLock::new(VecDeque::with_capacity(max_size)),
            max_size,
        }
    }

    pub async fn record(&self, reading: SensorReading) {
        let mut readings = self.readings.write().await;
        if readings.len() == self.max_size {
            readings.pop_front();
        }
        readings.push_back(reading);
    }

    pub async fn all(&self) -> Vec<SensorReading> {
        self.readings.read().await.iter().cloned().collect()
    }

    pub async fn latest(&self) -> Option<SensorReading> {
        self.readings.read().await.back().cloned()
    }

    pub async fn count(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn stats(&self) -> ReadingStats {
        let readings = self.readings.read().await;
        if readings.is_empty() {
            return ReadingStats {
                count: 0,
                average_temperature: 0.0,
                average_humidity: 0.0,
                active_sensors: 0,
                latest_event: None,
            };
        }

        let count = readings.len();
        let total_temperature: f64 = readings.iter().map(|r| r.temperature).sum();
        let total_humidity: f64 = readings.iter().map(|r| r.humidity).sum();
        let active_sensors = readings.iter().filter(|r| r.status == "active").count();

        ReadingStats {
            count,
            average_temperature: total_temperature / count as f64,
            average_humidity: total_humidity / count as f64,
            active_sensors,
            latest_event: readings.back().cloned(),
        }
    }
}
