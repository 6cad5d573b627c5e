//! Automatic start schedules.
//!
//! A rule says "start a focus phase at HH:MM on these weekdays with these
//! settings". The evaluator answers one question per tick: is an enabled
//! rule due right now that has not fired yet today? Deduplication lives
//! here; the timer only applies what it is handed.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use flow_types::{TimerSettings, TypesError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Schedule errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The rule's time is not `HH:MM`.
    #[error("rule {id}: invalid time {time:?} (expected HH:MM)")]
    InvalidTime {
        /// Rule id.
        id: String,
        /// The offending value.
        time: String,
    },

    /// A weekday index is outside `0..=6`.
    #[error("rule {id}: invalid weekday {day} (expected 0-6, 0 = Sunday)")]
    InvalidDay {
        /// Rule id.
        id: String,
        /// The offending value.
        day: u8,
    },

    /// The rule's settings are out of range.
    #[error("rule {id}: {source}")]
    InvalidSettings {
        /// Rule id.
        id: String,
        /// Underlying validation error.
        source: TypesError,
    },
}

fn default_sound() -> String {
    "default".to_string()
}

fn default_enabled() -> bool {
    true
}

/// One automatic start rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRule {
    /// Stable identifier, used for per-day deduplication.
    pub id: String,
    /// Local start time, `HH:MM`.
    pub time: String,
    /// Weekdays the rule applies to, 0 = Sunday.
    pub days: Vec<u8>,
    /// Disabled rules never fire.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Alert sound name to use.
    #[serde(default = "default_sound")]
    pub sound: String,
    /// Settings applied when the rule fires.
    pub settings: TimerSettings,
}

impl ScheduleRule {
    /// Parsed start time.
    pub fn start_time(&self) -> Result<NaiveTime, ScheduleError> {
        NaiveTime::parse_from_str(&self.time, "%H:%M").map_err(|_| ScheduleError::InvalidTime {
            id: self.id.clone(),
            time: self.time.clone(),
        })
    }

    /// Check time format, weekday range and settings.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        self.start_time()?;
        if let Some(day) = self.days.iter().find(|d| **d > 6) {
            return Err(ScheduleError::InvalidDay {
                id: self.id.clone(),
                day: *day,
            });
        }
        self.settings
            .validate()
            .map_err(|source| ScheduleError::InvalidSettings {
                id: self.id.clone(),
                source,
            })
    }

    fn matches(&self, start: NaiveTime, now: &NaiveDateTime) -> bool {
        let weekday = now.weekday().num_days_from_sunday() as u8;
        self.enabled
            && self.days.contains(&weekday)
            && start.hour() == now.hour()
            && start.minute() == now.minute()
    }
}

/// Rule ids already fired on a given calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FiredSet {
    /// Day the ids belong to.
    pub date: Option<NaiveDate>,
    /// Fired rule ids.
    pub ids: BTreeSet<String>,
}

impl FiredSet {
    /// Whether `id` fired on `today`.
    pub fn contains(&self, id: &str, today: NaiveDate) -> bool {
        self.date == Some(today) && self.ids.contains(id)
    }

    /// Record `id` as fired on `today`, discarding entries from other days.
    pub fn insert(&mut self, id: &str, today: NaiveDate) {
        if self.date != Some(today) {
            self.date = Some(today);
            self.ids.clear();
        }
        self.ids.insert(id.to_string());
    }
}

/// What to do when a rule fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTrigger {
    /// The rule that fired.
    pub rule_id: String,
    /// Settings to apply before starting.
    pub settings: TimerSettings,
    /// Alert sound to select.
    pub sound: String,
}

/// Evaluates rules against the local clock.
#[derive(Debug, Clone, Default)]
pub struct ScheduleEvaluator {
    rules: Vec<(NaiveTime, ScheduleRule)>,
    fired: FiredSet,
}

impl ScheduleEvaluator {
    /// Validate and sort `rules` by start time.
    pub fn new(rules: Vec<ScheduleRule>) -> Result<Self, ScheduleError> {
        let mut parsed = rules
            .into_iter()
            .map(|rule| {
                rule.validate()?;
                Ok((rule.start_time()?, rule))
            })
            .collect::<Result<Vec<_>, ScheduleError>>()?;
        parsed.sort_by_key(|(time, _)| *time);
        Ok(Self {
            rules: parsed,
            fired: FiredSet::default(),
        })
    }

    /// Resume with a previously persisted fired set.
    pub fn with_fired(mut self, fired: FiredSet) -> Self {
        self.fired = fired;
        self
    }

    /// Rules in start-time order.
    pub fn rules(&self) -> impl Iterator<Item = &ScheduleRule> {
        self.rules.iter().map(|(_, rule)| rule)
    }

    /// Fired set, for persistence.
    pub fn fired(&self) -> &FiredSet {
        &self.fired
    }

    /// Return the first due, unfired, enabled rule and mark it fired.
    ///
    /// At most one trigger per call; a second rule due in the same minute
    /// is returned by the next call.
    pub fn due(&mut self, now: NaiveDateTime) -> Option<ScheduleTrigger> {
        let today = now.date();
        let (_, rule) = self
            .rules
            .iter()
            .find(|(start, rule)| rule.matches(*start, &now) && !self.fired.contains(&rule.id, today))?;

        let trigger = ScheduleTrigger {
            rule_id: rule.id.clone(),
            settings: rule.settings,
            sound: rule.sound.clone(),
        };
        self.fired.insert(&trigger.rule_id, today);
        Some(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, time: &str, days: &[u8]) -> ScheduleRule {
        ScheduleRule {
            id: id.to_string(),
            time: time.to_string(),
            days: days.to_vec(),
            enabled: true,
            settings: TimerSettings::new(50, 10, 2),
            sound: "bell".to_string(),
        }
    }

    /// 2026-10-19 is a Monday (weekday 1).
    fn monday(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn fires_within_the_matching_minute() {
        let mut eval = ScheduleEvaluator::new(vec![rule("a", "09:00", &[1])]).unwrap();

        assert!(eval.due(monday(8, 59, 59)).is_none());
        let trigger = eval.due(monday(9, 0, 30)).unwrap();
        assert_eq!(trigger.rule_id, "a");
        assert_eq!(trigger.settings, TimerSettings::new(50, 10, 2));
        assert_eq!(trigger.sound, "bell");
    }

    #[test]
    fn fires_once_per_day() {
        let mut eval = ScheduleEvaluator::new(vec![rule("a", "09:00", &[1, 2])]).unwrap();

        assert!(eval.due(monday(9, 0, 0)).is_some());
        assert!(eval.due(monday(9, 0, 40)).is_none());

        let tuesday = monday(9, 0, 5) + chrono::Duration::days(1);
        assert!(eval.due(tuesday).is_some());
    }

    #[test]
    fn skips_other_weekdays_and_disabled_rules() {
        let mut off = rule("b", "09:00", &[1]);
        off.enabled = false;
        let mut eval = ScheduleEvaluator::new(vec![rule("a", "09:00", &[0, 6]), off]).unwrap();

        assert!(eval.due(monday(9, 0, 0)).is_none());
    }

    #[test]
    fn same_minute_rules_fire_on_successive_calls() {
        let mut eval =
            ScheduleEvaluator::new(vec![rule("late", "09:00", &[1]), rule("early", "09:00", &[1])])
                .unwrap();

        let first = eval.due(monday(9, 0, 0)).unwrap();
        let second = eval.due(monday(9, 0, 1)).unwrap();
        assert_ne!(first.rule_id, second.rule_id);
        assert!(eval.due(monday(9, 0, 2)).is_none());
    }

    #[test]
    fn rules_are_sorted_by_time() {
        let eval = ScheduleEvaluator::new(vec![
            rule("c", "18:30", &[1]),
            rule("a", "07:15", &[1]),
            rule("b", "12:00", &[1]),
        ])
        .unwrap();
        let ids: Vec<_> = eval.rules().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn rejects_bad_time() {
        let err = ScheduleEvaluator::new(vec![rule("x", "9am", &[1])]).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidTime { .. }));
    }

    #[test]
    fn rejects_bad_weekday() {
        let err = ScheduleEvaluator::new(vec![rule("x", "09:00", &[7])]).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::InvalidDay {
                id: "x".into(),
                day: 7
            }
        );
    }

    #[test]
    fn persisted_fired_set_from_today_suppresses_rule() {
        let mut fired = FiredSet::default();
        fired.insert("a", monday(0, 0, 0).date());
        let mut eval = ScheduleEvaluator::new(vec![rule("a", "09:00", &[1])])
            .unwrap()
            .with_fired(fired);

        assert!(eval.due(monday(9, 0, 0)).is_none());
    }

    #[test]
    fn fired_set_from_yesterday_is_discarded() {
        let mut fired = FiredSet::default();
        let yesterday = monday(0, 0, 0).date().pred_opt().unwrap();
        fired.insert("a", yesterday);
        fired.insert("a", monday(0, 0, 0).date());
        assert_eq!(fired.ids.len(), 1);
        assert_eq!(fired.date, Some(monday(0, 0, 0).date()));
    }

    #[test]
    fn rule_deserializes_with_defaults() {
        let json = r#"{
            "id": "morning",
            "time": "08:30",
            "days": [1, 2, 3, 4, 5],
            "settings": {"focus_minutes": 25, "break_minutes": 5, "sessions_per_cycle": 4}
        }"#;
        let rule: ScheduleRule = serde_json::from_str(json).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.sound, "default");
    }
}
