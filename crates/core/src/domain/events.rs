use serde::{Deserialize, Serialize};

use crate::domain::geomag::GScale;
use crate::domain::policy::HistoricalOverride;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventRiskLevel {
    Low,
    Moderate,
    High,
    Severe,
    Extreme,
}

/// Reference storm with the model's prediction next to what was observed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEvent {
    pub date: String,
    pub name: String,
    pub description: String,
    pub actual_kp: f64,
    pub predicted_kp: f64,
    pub accuracy: f64,
    pub risk_level: EventRiskLevel,
    pub impact_description: String,
}

impl HistoricalEvent {
    pub fn g_scale(&self) -> GScale {
        GScale::from_kp(self.actual_kp)
    }

    pub fn to_override(&self) -> HistoricalOverride {
        HistoricalOverride {
            historical_kp: self.actual_kp,
            historical_event_name: self.name.clone(),
            historical_date: self.date.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogSummary {
    pub events: usize,
    pub average_accuracy: Option<f64>,
    pub extreme_events: usize,
}

#[derive(Clone, Debug, Default)]
pub struct HistoricalCatalog {
    events: Vec<HistoricalEvent>,
}

impl HistoricalCatalog {
    pub fn new(events: Vec<HistoricalEvent>) -> Self {
        Self { events }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            event(
                "2001-03-31",
                "Halloween Storm 2001",
                "Major geomagnetic storm caused by a large solar flare and coronal mass ejection",
                (8.67, 6.90, 79.6),
                EventRiskLevel::Extreme,
                "Severe satellite disruptions, GPS outages, power grid fluctuations",
            ),
            event(
                "2004-07-27",
                "Bastille Day Storm 2004",
                "Powerful solar storm that affected satellite communications globally",
                (8.67, 8.60, 99.2),
                EventRiskLevel::Extreme,
                "Critical satellite operations affected, widespread communication disruptions",
            ),
            event(
                "2003-11-20",
                "November 2003 Solar Storm",
                "Series of intense solar flares during solar maximum",
                (8.67, 8.53, 98.4),
                EventRiskLevel::Extreme,
                "Multiple satellite anomalies, navigation system interference",
            ),
            event(
                "2004-11-10",
                "Superstorm November 2004",
                "One of the most intense geomagnetic storms of the solar cycle",
                (8.67, 8.13, 93.8),
                EventRiskLevel::Extreme,
                "Severe satellite damage, complete GPS blackouts in some regions",
            ),
            event(
                "2005-08-24",
                "August 2005 Solar Event",
                "Significant space weather event during declining solar activity",
                (8.67, 7.40, 85.4),
                EventRiskLevel::Extreme,
                "Satellite operations severely impacted, insurance claims filed",
            ),
            event(
                "2012-03-09",
                "March 2012 Storm",
                "Modern era space weather event affecting advanced satellite systems",
                (8.00, 6.38, 79.8),
                EventRiskLevel::Severe,
                "Modern satellite constellations experienced service degradation",
            ),
            event(
                "2015-03-17",
                "St. Patrick's Day Storm 2015",
                "A strong geomagnetic storm during the solar minimum, with aurora sightings at unusually low latitudes",
                (6.5, 7.0, 85.5),
                EventRiskLevel::Severe,
                "Significant satellite operational anomalies, forcing some operators into safe mode",
            ),
        ])
    }

    pub fn events(&self) -> &[HistoricalEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoricalEvent> {
        self.events.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&HistoricalEvent> {
        let needle = name.trim();
        self.events.iter().find(|event| event.name.eq_ignore_ascii_case(needle))
    }

    pub fn summary(&self) -> CatalogSummary {
        let average_accuracy = (!self.events.is_empty()).then(|| {
            self.events.iter().map(|event| event.accuracy).sum::<f64>() / self.events.len() as f64
        });
        let extreme_events =
            self.events.iter().filter(|event| event.risk_level == EventRiskLevel::Extreme).count();

        CatalogSummary { events: self.events.len(), average_accuracy, extreme_events }
    }
}

fn event(
    date: &str,
    name: &str,
    description: &str,
    (actual_kp, predicted_kp, accuracy): (f64, f64, f64),
    risk_level: EventRiskLevel,
    impact_description: &str,
) -> HistoricalEvent {
    HistoricalEvent {
        date: date.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        actual_kp,
        predicted_kp,
        accuracy,
        risk_level,
        impact_description: impact_description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::events::{EventRiskLevel, HistoricalCatalog};
    use crate::domain::geomag::GScale;

    #[test]
    fn builtin_catalog_summary() {
        let catalog = HistoricalCatalog::builtin();
        let summary = catalog.summary();

        assert_eq!(summary.events, 7);
        assert_eq!(summary.extreme_events, 5);
        let average = summary.average_accuracy.expect("non-empty catalog");
        assert!((average - 88.814_285).abs() < 1e-3);
    }

    #[test]
    fn find_is_case_insensitive() {
        let catalog = HistoricalCatalog::builtin();
        let event = catalog.find("  bastille day storm 2004 ").expect("event exists");

        assert_eq!(event.date, "2004-07-27");
        assert_eq!(event.risk_level, EventRiskLevel::Extreme);
        assert_eq!(event.g_scale(), GScale::G4);
        assert!(catalog.find("Carrington Event").is_none());
    }

    #[test]
    fn override_echoes_actual_kp() {
        let catalog = HistoricalCatalog::builtin();
        let event = catalog.get(6).expect("seventh event");
        let historical = event.to_override();

        assert_eq!(historical.historical_kp, event.actual_kp);
        assert_eq!(historical.historical_event_name, "St. Patrick's Day Storm 2015");
        assert_eq!(historical.historical_date, "2015-03-17");
    }

    #[test]
    fn empty_catalog_has_no_average() {
        let summary = HistoricalCatalog::default().summary();
        assert_eq!(summary.events, 0);
        assert_eq!(summary.average_accuracy, None);
    }
}
