//! Controller status document.
//!
//! The JSON shape is the external contract the status endpoint has always
//! served:
//!
//! ```json
//! {
//!   "fans": [{ "rpm": 1200, "duty": 30.2 }, { "rpm": 0, "duty": 100.0 }],
//!   "tempSensors": {
//!     "maxTempF": 85.5, "maxTempC": 29.7,
//!     "sensors": [{ "tempF": 85.5, "tempC": 29.7 }]
//!   }
//! }
//! ```

use serde::Serialize;

use crate::app::ports::ClockPort;
use crate::control::fan::FanHandle;
use crate::sensors::temperature::TemperatureView;
use crate::sensors::MAX_PROBES;

pub const FAN_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FanStatus {
    pub rpm: u32,
    /// Applied duty cycle, percent.
    pub duty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorStatus {
    #[serde(rename = "tempF")]
    pub temp_f: f32,
    #[serde(rename = "tempC")]
    pub temp_c: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TempSensorsStatus {
    pub max_temp_f: f32,
    pub max_temp_c: f32,
    pub sensors: heapless::Vec<SensorStatus, MAX_PROBES>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub fans: heapless::Vec<FanStatus, FAN_COUNT>,
    pub temp_sensors: TempSensorsStatus,
}

impl StatusReport {
    /// Gather the current state.  Temperatures come from one snapshot copy,
    /// so per-probe values and the maximum always belong to the same poll.
    ///
    /// Reading RPM restarts each fan's pulse window.
    pub fn collect<C: ClockPort + Clone>(fans: &[FanHandle<C>], temperatures: &TemperatureView) -> Self {
        let mut fan_status = heapless::Vec::new();
        for fan in fans.iter().take(FAN_COUNT) {
            let _ = fan_status.push(FanStatus {
                rpm: fan.fan_rpm(),
                duty: fan.last_duty_cycle_percent(),
            });
        }

        let snapshot = temperatures.snapshot();
        let mut sensors = heapless::Vec::new();
        for i in 0..snapshot.probe_count() {
            let _ = sensors.push(SensorStatus {
                temp_f: snapshot.fahrenheit(i),
                temp_c: snapshot.celsius(i),
            });
        }

        Self {
            fans: fan_status,
            temp_sensors: TempSensorsStatus {
                max_temp_f: snapshot.max_fahrenheit(),
                max_temp_c: snapshot.max_celsius(),
                sensors,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_field_names_match_contract() {
        let mut fans = heapless::Vec::new();
        fans.push(FanStatus { rpm: 1200, duty: 30.0 }).unwrap();
        let mut sensors = heapless::Vec::new();
        sensors.push(SensorStatus { temp_f: 85.5, temp_c: 29.75 }).unwrap();
        let report = StatusReport {
            fans,
            temp_sensors: TempSensorsStatus {
                max_temp_f: 85.5,
                max_temp_c: 29.75,
                sensors,
            },
        };

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["fans"][0]["rpm"], 1200);
        assert_eq!(value["fans"][0]["duty"], 30.0);
        assert_eq!(value["tempSensors"]["maxTempF"], 85.5);
        assert_eq!(value["tempSensors"]["maxTempC"], 29.75);
        assert_eq!(value["tempSensors"]["sensors"][0]["tempF"], 85.5);
        assert_eq!(value["tempSensors"]["sensors"][0]["tempC"], 29.75);
    }
}
