//! Built-in weekly schedule shown before the host pushes real events.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};

use crate::model::{EventCategory, LauncherEvent};

struct Recurring {
    id: &'static str,
    name: &'static str,
    category: EventCategory,
    hour: u32,
    minute: u32,
    /// Empty means every day
    days: &'static [Weekday],
    description: &'static str,
}

const WEEKEND: &[Weekday] = &[Weekday::Sat, Weekday::Sun];

const SCHEDULE: &[Recurring] = &[
    Recurring {
        id: "blood-castle",
        name: "Blood Castle",
        category: EventCategory::Events,
        hour: 0,
        minute: 0,
        days: &[],
        description: "Rescue the princess before the castle falls",
    },
    Recurring {
        id: "devil-square",
        name: "Devil Square",
        category: EventCategory::Events,
        hour: 1,
        minute: 0,
        days: &[],
        description: "Survive the waves for bonus experience",
    },
    Recurring {
        id: "chaos-castle",
        name: "Chaos Castle",
        category: EventCategory::Events,
        hour: 2,
        minute: 0,
        days: &[],
        description: "Last player standing wins",
    },
    Recurring {
        id: "golden-invasion",
        name: "Golden Invasion",
        category: EventCategory::Invasions,
        hour: 12,
        minute: 0,
        days: WEEKEND,
        description: "Golden monsters appear across the continent",
    },
    Recurring {
        id: "red-dragon",
        name: "Red Dragon",
        category: EventCategory::Bosses,
        hour: 20,
        minute: 0,
        days: &[Weekday::Fri, Weekday::Sat, Weekday::Sun],
        description: "The Red Dragon attacks Lorencia",
    },
    Recurring {
        id: "castle-siege",
        name: "Castle Siege",
        category: EventCategory::Others,
        hour: 19,
        minute: 0,
        days: &[Weekday::Sat],
        description: "Guild alliances fight for the crown",
    },
];

impl Recurring {
    fn runs_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }

    /// First start strictly after `now`, in the clock of `now`'s zone
    fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;
        let today = now.date_naive();

        (0..=7)
            .map(|offset| today + Duration::days(offset))
            .filter(|date| self.runs_on(date.weekday()))
            .filter_map(|date| now.timezone().from_local_datetime(&date.and_time(time)).earliest())
            .find(|start| start > now)
            .map(|start| start.with_timezone(&Utc))
    }

    fn to_event(&self, next_start: DateTime<Utc>) -> LauncherEvent {
        LauncherEvent {
            id: self.id.to_string(),
            name: self.name.to_string(),
            category: self.category,
            next_start,
            description: Some(self.description.to_string()),
        }
    }
}

/// Placeholder events resolved against the given local clock
pub fn placeholder_events<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<LauncherEvent> {
    SCHEDULE
        .iter()
        .filter_map(|entry| entry.next_after(now).map(|start| entry.to_event(start)))
        .collect()
}
