//! Changelog heatmap aggregation.
//!
//! Buckets change events by UTC calendar day and lays a year out into
//! Monday-first week columns, contribution-graph style. All derivations
//! here are pure: filtering never rewrites the source map, and the grid
//! is recomputed from scratch whenever the inputs change.

use super::{ChangeCategory, ChangeEvent};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Events grouped by UTC calendar date.
pub type DayMap = BTreeMap<NaiveDate, Vec<ChangeEvent>>;

/// Bucket events by their UTC calendar date.
pub fn group_by_day(events: &[ChangeEvent]) -> DayMap {
    let mut days = DayMap::new();
    for event in events {
        days.entry(event.timestamp.date_naive())
            .or_default()
            .push(event.clone());
    }
    days
}

/// Derive a filtered day map for one category, or a structural copy for
/// `None` ("ALL"). An event survives if it has at least one matching
/// field change, and surviving events are trimmed to the matching
/// changes. The source map is never touched.
pub fn filter_category(days: &DayMap, category: Option<ChangeCategory>) -> DayMap {
    let Some(category) = category else {
        return days.clone();
    };

    let mut filtered = DayMap::new();
    for (day, events) in days {
        let kept: Vec<ChangeEvent> = events
            .iter()
            .filter_map(|event| {
                let changes: Vec<_> = event
                    .changes
                    .iter()
                    .filter(|change| change.category == category)
                    .cloned()
                    .collect();
                if changes.is_empty() {
                    None
                } else {
                    Some(ChangeEvent {
                        changes,
                        ..event.clone()
                    })
                }
            })
            .collect();
        if !kept.is_empty() {
            filtered.insert(*day, kept);
        }
    }
    filtered
}

/// One grid cell: either a filler keeping a week column at 7 rows, or a
/// real calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Filler,
    Day(DayCell),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub count: usize,
    /// Before the data's start date or after today; rendered muted and
    /// never clickable.
    pub excluded: bool,
}

impl DayCell {
    pub fn clickable(&self) -> bool {
        self.count > 0 && !self.excluded
    }
}

/// A week column, Monday at the top, always exactly 7 cells.
#[derive(Debug, Clone)]
pub struct Week {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone)]
pub struct YearGrid {
    pub year: i32,
    pub weeks: Vec<Week>,
}

/// Lay out one calendar year as Monday-first week columns.
///
/// Leading fillers pad week 1 up to January 1st's weekday; trailing
/// fillers complete the final column. `data_start` marks the first date
/// with any recorded history; days before it, and days after `today`,
/// come out excluded.
pub fn year_grid(
    year: i32,
    days: &DayMap,
    data_start: Option<NaiveDate>,
    today: NaiveDate,
) -> YearGrid {
    let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return YearGrid {
            year,
            weeks: Vec::new(),
        };
    };
    let dec31 = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(jan1);

    let lead = jan1.weekday().num_days_from_monday() as usize;
    let mut cells: Vec<Cell> = Vec::with_capacity(lead + 366 + 6);
    cells.extend(std::iter::repeat(Cell::Filler).take(lead));

    let mut date = jan1;
    loop {
        let count = days.get(&date).map(Vec::len).unwrap_or(0);
        let excluded = data_start.map(|start| date < start).unwrap_or(false) || date > today;
        cells.push(Cell::Day(DayCell {
            date,
            count,
            excluded,
        }));
        if date == dec31 {
            break;
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    while cells.len() % 7 != 0 {
        cells.push(Cell::Filler);
    }

    let weeks = cells
        .chunks(7)
        .map(|chunk| Week {
            cells: chunk.to_vec(),
        })
        .collect();

    YearGrid { year, weeks }
}

/// Density tier for a day cell. Thresholds are an exact contract:
/// 0 events is empty, then >=1, >=2 and >=10, checked highest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTier {
    Empty,
    Tier1,
    Tier2,
    Tier3,
}

pub fn color_tier(count: usize) -> ColorTier {
    if count >= 10 {
        ColorTier::Tier3
    } else if count >= 2 {
        ColorTier::Tier2
    } else if count >= 1 {
        ColorTier::Tier1
    } else {
        ColorTier::Empty
    }
}

impl ColorTier {
    pub fn css_class(&self) -> &'static str {
        match self {
            ColorTier::Empty => "tier-0",
            ColorTier::Tier1 => "tier-1",
            ColorTier::Tier2 => "tier-2",
            ColorTier::Tier3 => "tier-3",
        }
    }
}
