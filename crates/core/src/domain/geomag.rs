//! NOAA geomagnetic payloads and the analytics the dashboards derive from them.
//!
//! Kp values are stored exactly as the backend reports them. Clamping to the
//! 0..=9 scale happens only when a value is prepared for display.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const KP_MIN: f64 = 0.0;
pub const KP_MAX: f64 = 9.0;
pub const DEFAULT_HISTORY_LIMIT: u32 = 30;
/// Window behind the recent-activity figures on the forecast view.
pub const RECENT_ACTIVITY_DAYS: u32 = 14;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KpIndex(pub f64);

impl KpIndex {
    pub fn raw(&self) -> f64 {
        self.0
    }

    pub fn display_value(&self) -> f64 {
        clamp_kp(self.0)
    }

    pub fn g_scale(&self) -> GScale {
        GScale::from_kp(self.0)
    }

    pub fn band(&self) -> KpBand {
        KpBand::from_kp(self.0)
    }
}

pub fn clamp_kp(kp: f64) -> f64 {
    if kp.is_nan() {
        return KP_MIN;
    }
    kp.clamp(KP_MIN, KP_MAX)
}

/// NOAA geomagnetic storm scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GScale {
    G0,
    G1,
    G2,
    G3,
    G4,
    G5,
}

impl GScale {
    pub fn from_kp(kp: f64) -> Self {
        match kp {
            kp if kp >= 9.0 => Self::G5,
            kp if kp >= 8.0 => Self::G4,
            kp if kp >= 7.0 => Self::G3,
            kp if kp >= 6.0 => Self::G2,
            kp if kp >= 5.0 => Self::G1,
            _ => Self::G0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::G0 => "G0 Quiet",
            Self::G1 => "G1 Minor",
            Self::G2 => "G2 Moderate",
            Self::G3 => "G3 Strong",
            Self::G4 => "G4 Severe",
            Self::G5 => "G5 Extreme",
        }
    }

    pub fn is_storm(&self) -> bool {
        *self >= Self::G1
    }
}

/// Operational risk band used on the forecast page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KpBand {
    Quiet,
    Minor,
    Moderate,
    Strong,
    Severe,
}

impl KpBand {
    pub fn from_kp(kp: f64) -> Self {
        match kp {
            kp if kp >= 8.0 => Self::Severe,
            kp if kp >= 7.0 => Self::Strong,
            kp if kp >= 5.0 => Self::Moderate,
            kp if kp >= 4.0 => Self::Minor,
            _ => Self::Quiet,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Severe => "Critical risk to satellite operations, widespread disruptions likely",
            Self::Strong => "High risk to satellites, especially those in vulnerable orbits",
            Self::Moderate => "Increased risk to satellite operations, minor disruptions possible",
            Self::Minor => "Low risk to satellite operations, minimal impact expected",
            Self::Quiet => "Favorable conditions for satellite operations",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default)]
    pub items: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyGeomagDay {
    pub date: String,
    #[serde(default)]
    pub ap: Option<f64>,
    #[serde(default)]
    pub kp_values: Vec<f64>,
    #[serde(default)]
    pub kp_max: Option<f64>,
    #[serde(default)]
    pub kp_avg: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyGeomag {
    #[serde(default)]
    pub days: Vec<DailyGeomagDay>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastBreakdownRow {
    pub period: String,
    #[serde(default)]
    pub values: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreeDayForecast {
    #[serde(default)]
    pub issued: Option<String>,
    #[serde(default)]
    pub observed_max_kp: Option<f64>,
    #[serde(default)]
    pub expected_max_kp: Option<f64>,
    #[serde(default)]
    pub days: Vec<String>,
    #[serde(default)]
    pub breakdown: Vec<ForecastBreakdownRow>,
    #[serde(default)]
    pub rationale: String,
}

impl ThreeDayForecast {
    pub fn expected_band(&self) -> Option<KpBand> {
        self.expected_max_kp.map(KpBand::from_kp)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KpPoint {
    pub timestamp: String,
    pub kp: f64,
}

/// Turns the period x day breakdown table into a time series.
///
/// Each period row like `"00-03UT"` contributes one point per forecast day,
/// stamped at the period's starting hour. Values without a matching day are
/// dropped.
pub fn flatten_forecast(forecast: &ThreeDayForecast) -> Vec<KpPoint> {
    let mut points = Vec::new();
    for row in &forecast.breakdown {
        let hour: String = row.period.chars().take(2).collect();
        for (day_index, kp) in row.values.iter().enumerate() {
            let Some(day) = forecast.days.get(day_index) else {
                continue;
            };
            points.push(KpPoint { timestamp: format!("{day}T{hour}:00:00Z"), kp: *kp });
        }
    }
    // ISO-8601 stamps with fixed-width fields sort lexically.
    points.sort_by(|left, right| left.timestamp.cmp(&right.timestamp));
    points
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodAssessment {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl PeriodAssessment {
    pub fn evaluate(max_kp: f64, storm_days: usize, total_days: usize) -> Self {
        let storm_pct =
            if total_days > 0 { storm_days as f64 / total_days as f64 * 100.0 } else { 0.0 };

        if max_kp >= 8.0 {
            Self::Critical
        } else if max_kp >= 7.0 {
            Self::High
        } else if max_kp >= 6.0 || storm_pct > 15.0 {
            Self::Moderate
        } else if max_kp >= 5.0 || storm_pct > 5.0 {
            Self::Low
        } else {
            Self::Minimal
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Stable,
    Increasing,
    Decreasing,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub change_pct: f64,
}

impl Trend {
    const STABLE: Self = Self { direction: TrendDirection::Stable, change_pct: 0.0 };

    /// Compares the mean daily average of the last seven days with the seven before.
    ///
    /// `averages` holds one clamped `kp_avg` per complete day, oldest first.
    /// A quiet previous week followed by any activity counts as an unbounded
    /// increase.
    pub fn from_averages(averages: &[f64]) -> Self {
        if averages.len() < 14 {
            return Self::STABLE;
        }

        let split = averages.len() - 7;
        let (Some(recent), Some(previous)) = (
            mean(averages[split..].iter().copied()),
            mean(averages[split - 7..split].iter().copied()),
        ) else {
            return Self::STABLE;
        };
        if previous == 0.0 {
            return if recent > 0.0 {
                Self { direction: TrendDirection::Increasing, change_pct: f64::INFINITY }
            } else {
                Self::STABLE
            };
        }

        let change_pct = (recent - previous) / previous * 100.0;
        let direction = if change_pct.abs() < 5.0 {
            TrendDirection::Stable
        } else if change_pct > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };
        Self { direction, change_pct }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryAnalytics {
    pub max_kp: f64,
    pub avg_kp: f64,
    pub storm_days: usize,
    pub high_risk_days: usize,
    pub total_days: usize,
    pub operational_impact: f64,
    pub volatility: f64,
    pub assessment: PeriodAssessment,
    pub trend: Trend,
}

impl HistoryAnalytics {
    pub fn from_days(days: &[DailyGeomagDay]) -> Self {
        let valid: Vec<(f64, f64)> = days
            .iter()
            .filter_map(|day| match (day.kp_max, day.kp_avg) {
                (Some(max), Some(avg)) => Some((max.min(KP_MAX), avg.min(KP_MAX))),
                _ => None,
            })
            .collect();
        let averages: Vec<f64> = valid.iter().map(|(_, avg)| *avg).collect();
        let trend = Trend::from_averages(&averages);

        if valid.is_empty() {
            return Self {
                max_kp: 0.0,
                avg_kp: 0.0,
                storm_days: 0,
                high_risk_days: 0,
                total_days: 0,
                operational_impact: 0.0,
                volatility: 0.0,
                assessment: PeriodAssessment::Minimal,
                trend,
            };
        }

        let total_days = valid.len();
        let max_kp = valid.iter().map(|(max, _)| *max).fold(f64::MIN, f64::max);
        let avg_kp = valid.iter().map(|(_, avg)| *avg).sum::<f64>() / total_days as f64;
        let storm_days = valid.iter().filter(|(max, _)| *max >= 5.0).count();
        let high_risk_days = valid.iter().filter(|(max, _)| *max >= 6.0).count();
        let operational_impact =
            (storm_days as f64 / total_days as f64 * 100.0 + (max_kp - 3.0) * 10.0).min(100.0);
        let variance = valid.iter().map(|(max, _)| (max - avg_kp).powi(2)).sum::<f64>()
            / total_days as f64;

        Self {
            max_kp,
            avg_kp,
            storm_days,
            high_risk_days,
            total_days,
            operational_impact,
            volatility: variance.sqrt(),
            assessment: PeriodAssessment::evaluate(max_kp, storm_days, total_days),
            trend,
        }
    }
}

/// Recent-activity figures shown beside the 3-day forecast.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RecentActivity {
    pub max_kp: Option<f64>,
    pub mean_max_kp: Option<f64>,
}

impl RecentActivity {
    pub fn from_days(days: &[DailyGeomagDay]) -> Self {
        if days.is_empty() {
            return Self { max_kp: None, mean_max_kp: None };
        }
        let max_kp = days.iter().map(|day| day.kp_max.unwrap_or(0.0)).fold(f64::MIN, f64::max);
        Self { max_kp: Some(max_kp), mean_max_kp: mean(days.iter().filter_map(|day| day.kp_max)) }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn day(date: &str, kp_max: Option<f64>, kp_avg: Option<f64>) -> DailyGeomagDay {
        DailyGeomagDay { date: date.to_string(), ap: None, kp_values: Vec::new(), kp_max, kp_avg }
    }

    #[test]
    fn display_clamp_does_not_touch_stored_value() {
        let kp = KpIndex(11.3);
        assert_eq!(kp.display_value(), 9.0);
        assert_eq!(kp.raw(), 11.3);
        assert_eq!(KpIndex(-1.0).display_value(), 0.0);
    }

    #[test]
    fn g_scale_thresholds() {
        assert_eq!(GScale::from_kp(4.99), GScale::G0);
        assert_eq!(GScale::from_kp(5.0), GScale::G1);
        assert_eq!(GScale::from_kp(6.0), GScale::G2);
        assert_eq!(GScale::from_kp(7.2), GScale::G3);
        assert_eq!(GScale::from_kp(8.67), GScale::G4);
        assert_eq!(GScale::from_kp(9.0), GScale::G5);
        assert!(!GScale::G0.is_storm());
        assert_eq!(KpIndex(7.2).g_scale().label(), "G3 Strong");
    }

    #[test]
    fn forecast_band_thresholds() {
        assert_eq!(KpBand::from_kp(3.67), KpBand::Quiet);
        assert_eq!(KpBand::from_kp(4.0), KpBand::Minor);
        assert_eq!(KpBand::from_kp(6.33), KpBand::Moderate);
        assert_eq!(KpBand::from_kp(7.0), KpBand::Strong);
        assert_eq!(KpBand::from_kp(8.0), KpBand::Severe);
    }

    #[test]
    fn forecast_breakdown_flattens_in_time_order() {
        let forecast: ThreeDayForecast = serde_json::from_value(json!({
            "issued": "2025-05-01 0030 UTC",
            "observed_max_kp": 4.33,
            "expected_max_kp": 5.67,
            "days": ["2025-05-01", "2025-05-02", "2025-05-03"],
            "breakdown": [
                { "period": "03-06UT", "values": [3.0, 4.0, 2.33] },
                { "period": "00-03UT", "values": [2.67, 5.67, 2.0] }
            ],
            "rationale": "CH HSS influence"
        }))
        .expect("forecast payload");

        let points = flatten_forecast(&forecast);
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].timestamp, "2025-05-01T00:00:00Z");
        assert_eq!(points[0].kp, 2.67);
        assert_eq!(points[1].timestamp, "2025-05-01T03:00:00Z");
        assert_eq!(points[5].timestamp, "2025-05-03T03:00:00Z");
        assert_eq!(forecast.expected_band(), Some(KpBand::Moderate));
    }

    #[test]
    fn history_analytics_skips_incomplete_days_and_clamps() {
        let days = vec![
            day("2025-04-01", Some(2.0), Some(1.0)),
            day("2025-04-02", Some(5.33), Some(3.0)),
            day("2025-04-03", None, Some(2.0)),
            day("2025-04-04", Some(12.0), Some(4.0)),
        ];

        let analytics = HistoryAnalytics::from_days(&days);
        assert_eq!(analytics.total_days, 3);
        assert_eq!(analytics.max_kp, 9.0);
        assert_eq!(analytics.storm_days, 2);
        assert_eq!(analytics.high_risk_days, 1);
        assert_eq!(analytics.operational_impact, 100.0);
        assert_eq!(analytics.assessment, PeriodAssessment::Critical);
        assert!((analytics.avg_kp - 8.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn period_assessment_uses_storm_share() {
        assert_eq!(PeriodAssessment::evaluate(4.0, 0, 30), PeriodAssessment::Minimal);
        assert_eq!(PeriodAssessment::evaluate(4.0, 2, 30), PeriodAssessment::Low);
        assert_eq!(PeriodAssessment::evaluate(4.0, 5, 30), PeriodAssessment::Moderate);
        assert_eq!(PeriodAssessment::evaluate(7.0, 1, 30), PeriodAssessment::High);
    }

    #[test]
    fn trend_needs_two_full_weeks() {
        assert_eq!(Trend::from_averages(&[2.0; 13]).direction, TrendDirection::Stable);

        let mut rising = vec![2.0; 7];
        rising.extend([3.0; 7]);
        let trend = Trend::from_averages(&rising);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!((trend.change_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn trend_ignores_incomplete_days_inside_the_window() {
        let mut days: Vec<_> =
            (0..7).map(|i| day(&format!("a{i}"), Some(3.0), Some(2.0))).collect();
        days.extend((0..7).map(|i| day(&format!("b{i}"), None, Some(4.0))));
        days.extend((0..7).map(|i| day(&format!("c{i}"), Some(3.0), Some(2.0))));

        let analytics = HistoryAnalytics::from_days(&days);
        assert_eq!(analytics.total_days, 14);
        assert_eq!(analytics.trend.direction, TrendDirection::Stable);
        assert_eq!(analytics.trend.change_pct, 0.0);
    }

    #[test]
    fn trend_after_quiet_week_is_increasing() {
        let mut averages = vec![0.0; 7];
        averages.extend([1.0; 7]);
        let trend = Trend::from_averages(&averages);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!(trend.change_pct.is_infinite());

        assert_eq!(Trend::from_averages(&[0.0; 14]).direction, TrendDirection::Stable);
    }

    #[test]
    fn empty_history_is_minimal() {
        let analytics = HistoryAnalytics::from_days(&[]);
        assert_eq!(analytics.total_days, 0);
        assert_eq!(analytics.assessment, PeriodAssessment::Minimal);
        assert_eq!(RecentActivity::from_days(&[]).max_kp, None);
    }

    #[test]
    fn recent_activity_treats_missing_max_as_zero_for_peak_only() {
        let days = vec![day("a", Some(3.0), None), day("b", None, None), day("c", Some(5.0), None)];
        let recent = RecentActivity::from_days(&days);
        assert_eq!(recent.max_kp, Some(5.0));
        assert_eq!(recent.mean_max_kp, Some(4.0));
    }
}
