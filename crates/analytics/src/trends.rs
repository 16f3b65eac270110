//! Time-bucketed trends and growth rates from daily metric buckets.

use crate::formulas;
use adgenius_core::campaign::DailyMetricRecord;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendBucket {
    /// First day covered by the bucket (Monday for weekly buckets).
    pub period_start: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    pub revenue: f64,
    pub ctr: f64,
    pub roas: f64,
}

impl TrendBucket {
    fn empty(period_start: NaiveDate) -> Self {
        Self {
            period_start,
            impressions: 0,
            clicks: 0,
            conversions: 0,
            spend: 0.0,
            revenue: 0.0,
            ctr: 0.0,
            roas: 0.0,
        }
    }

    fn add(&mut self, record: &DailyMetricRecord) {
        self.impressions = self.impressions.saturating_add(record.impressions);
        self.clicks = self.clicks.saturating_add(record.clicks);
        self.conversions = self.conversions.saturating_add(record.conversions);
        self.spend += record.spend;
        self.revenue += record.revenue;
        self.ctr = formulas::ctr(self.clicks, self.impressions);
        self.roas = formulas::roas(self.revenue, self.spend);
    }
}

/// Percent change from the first to the last daily bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthRates {
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub spend: f64,
    pub roas: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub daily: Vec<TrendBucket>,
    pub weekly: Vec<TrendBucket>,
    pub growth: GrowthRates,
    /// Up to three weekdays with the highest CTR.
    pub best_weekdays: Vec<Weekday>,
}

/// (last - first) / first × 100, or 0 when `first` is 0.
pub fn growth_rate(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        0.0
    } else {
        (last - first) / first * 100.0
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    let iso = date.iso_week();
    NaiveDate::from_isoywd_opt(iso.year(), iso.week(), Weekday::Mon).unwrap_or(date)
}

pub fn build_trends(records: &[DailyMetricRecord]) -> TrendAnalysis {
    let mut daily: BTreeMap<NaiveDate, TrendBucket> = BTreeMap::new();
    let mut weekly: BTreeMap<NaiveDate, TrendBucket> = BTreeMap::new();
    let mut by_weekday: BTreeMap<u32, (Weekday, i64, i64)> = BTreeMap::new();

    for record in records {
        daily
            .entry(record.date)
            .or_insert_with(|| TrendBucket::empty(record.date))
            .add(record);
        let week = week_start(record.date);
        weekly
            .entry(week)
            .or_insert_with(|| TrendBucket::empty(week))
            .add(record);
        let weekday = record.date.weekday();
        let slot = by_weekday
            .entry(weekday.num_days_from_monday())
            .or_insert((weekday, 0, 0));
        slot.1 = slot.1.saturating_add(record.impressions);
        slot.2 = slot.2.saturating_add(record.clicks);
    }

    let daily: Vec<TrendBucket> = daily.into_values().collect();
    let growth = match (daily.first(), daily.last()) {
        (Some(first), Some(last)) if daily.len() >= 2 => GrowthRates {
            impressions: growth_rate(first.impressions as f64, last.impressions as f64),
            clicks: growth_rate(first.clicks as f64, last.clicks as f64),
            conversions: growth_rate(first.conversions as f64, last.conversions as f64),
            spend: growth_rate(first.spend, last.spend),
            roas: growth_rate(first.roas, last.roas),
        },
        _ => GrowthRates::default(),
    };

    let mut weekdays: Vec<(Weekday, f64)> = by_weekday
        .into_values()
        .filter(|(_, impressions, _)| *impressions > 0)
        .map(|(day, impressions, clicks)| (day, formulas::ctr(clicks, impressions)))
        .collect();
    weekdays.sort_by(|a, b| b.1.total_cmp(&a.1));

    TrendAnalysis {
        daily,
        weekly: weekly.into_values().collect(),
        growth,
        best_weekdays: weekdays.into_iter().take(3).map(|(day, _)| day).collect(),
    }
}
