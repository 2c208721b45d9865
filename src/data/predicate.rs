use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use regex::Regex;

use super::classify::ColumnKind;
use super::model::{CellValue, Column};

// ---------------------------------------------------------------------------
// Constraints: the user-supplied parameter of one column filter
// ---------------------------------------------------------------------------

/// Filter parameter for one column. The variant matches the column's
/// [`ColumnKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Allowed values.
    Categorical(BTreeSet<CellValue>),
    /// Inclusive range.
    Numeric { min: f64, max: f64 },
    /// Inclusive `[from, to]` by slot; accepts all until both are picked.
    Temporal([Option<NaiveDateTime>; 2]),
    /// Substring or regex; empty accepts all.
    Textual(String),
}

impl Constraint {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Constraint::Categorical(_) => ColumnKind::Categorical,
            Constraint::Numeric { .. } => ColumnKind::Numeric,
            Constraint::Temporal(_) => ColumnKind::Temporal,
            Constraint::Textual(_) => ColumnKind::Textual,
        }
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A boolean test over one cell.
pub type Predicate = Box<dyn Fn(&CellValue) -> bool>;

pub fn accept_all() -> Predicate {
    Box::new(|_: &CellValue| true)
}

/// Build the row predicate for a column of `kind` under `constraint`.
///
/// Returns `None` when the constraint was made for a different kind of
/// column; the caller decides what to fall back to.
pub fn build_predicate(kind: ColumnKind, constraint: &Constraint) -> Option<Predicate> {
    if constraint.kind() != kind {
        return None;
    }

    let predicate: Predicate = match constraint {
        Constraint::Categorical(allowed) => {
            let allowed = allowed.clone();
            Box::new(move |v: &CellValue| allowed.contains(v))
        }
        Constraint::Numeric { min, max } => {
            let (min, max) = (*min, *max);
            Box::new(move |v: &CellValue| v.as_f64().is_some_and(|x| min <= x && x <= max))
        }
        Constraint::Temporal(endpoints) => match *endpoints {
            [Some(start), Some(end)] => {
                Box::new(move |v: &CellValue| {
                    v.as_datetime().is_some_and(|t| start <= t && t <= end)
                })
            }
            // Only one end picked so far: no filter this round.
            _ => accept_all(),
        },
        Constraint::Textual(pattern) if pattern.is_empty() => accept_all(),
        Constraint::Textual(pattern) => match Regex::new(pattern) {
            Ok(re) => Box::new(move |v: &CellValue| re.is_match(&v.as_text())),
            Err(err) => {
                log::debug!("'{pattern}' is not a regex ({err}), matching literally");
                let needle = pattern.clone();
                Box::new(move |v: &CellValue| v.as_text().contains(needle.as_str()))
            }
        },
    };
    Some(predicate)
}

// ---------------------------------------------------------------------------
// Control bounds
// ---------------------------------------------------------------------------

/// Range of a numeric column, used for slider limits and defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericBounds {
    pub min: f64,
    pub max: f64,
}

impl NumericBounds {
    /// `None` if the column has no numeric values.
    pub fn of(column: &Column) -> Option<Self> {
        column
            .values
            .iter()
            .filter_map(CellValue::as_f64)
            .filter(|x| !x.is_nan())
            .fold(None, |acc, x| match acc {
                None => Some(NumericBounds { min: x, max: x }),
                Some(b) => Some(NumericBounds {
                    min: b.min.min(x),
                    max: b.max.max(x),
                }),
            })
    }

    /// Slider step: a hundredth of the range.
    pub fn step(&self) -> f64 {
        (self.max - self.min) / 100.0
    }
}

/// Earliest and latest instant of a datetime column.
pub fn temporal_bounds(column: &Column) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut instants = column.values.iter().filter_map(CellValue::as_datetime);
    let first = instants.next()?;
    Some(instants.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn keep(pred: &Predicate, values: &[CellValue]) -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| pred(*v))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn numeric_range_is_inclusive() {
        let ages: Vec<CellValue> = [20, 21, 22, 23, 24, 40]
            .into_iter()
            .map(CellValue::Integer)
            .collect();
        let pred = build_predicate(
            ColumnKind::Numeric,
            &Constraint::Numeric { min: 20.0, max: 24.0 },
        )
        .unwrap();
        assert_eq!(keep(&pred, &ages), vec![0, 1, 2, 3, 4]);
        assert!(!pred(&CellValue::Null));
    }

    #[test]
    fn categorical_membership() {
        let allowed: BTreeSet<CellValue> = [CellValue::String("RS".into())].into();
        let pred = build_predicate(ColumnKind::Categorical, &Constraint::Categorical(allowed))
            .unwrap();
        let types: Vec<CellValue> = ["RS", "PO", "RS"]
            .iter()
            .map(|s| CellValue::String(s.to_string()))
            .collect();
        assert_eq!(keep(&pred, &types), vec![0, 2]);
    }

    #[test]
    fn temporal_range_needs_two_endpoints() {
        let values = vec![
            CellValue::DateTime(day(1)),
            CellValue::DateTime(day(5)),
            CellValue::DateTime(day(9)),
        ];
        let pred = build_predicate(
            ColumnKind::Temporal,
            &Constraint::Temporal([Some(day(1)), Some(day(5))]),
        )
        .unwrap();
        assert_eq!(keep(&pred, &values), vec![0, 1]);
        assert!(!pred(&CellValue::Null));

        for partial in [[Some(day(5)), None], [None, Some(day(5))], [None, None]] {
            let pred =
                build_predicate(ColumnKind::Temporal, &Constraint::Temporal(partial)).unwrap();
            assert_eq!(keep(&pred, &values), vec![0, 1, 2]);
        }
    }

    #[test]
    fn text_pattern_matching() {
        let values: Vec<CellValue> = vec![
            CellValue::String("xavier".into()),
            CellValue::String("Xena".into()),
            CellValue::Integer(42),
            CellValue::Null,
        ];

        let empty = build_predicate(ColumnKind::Textual, &Constraint::Textual(String::new()))
            .unwrap();
        assert_eq!(keep(&empty, &values), vec![0, 1, 2, 3]);

        let x = build_predicate(ColumnKind::Textual, &Constraint::Textual("x".into())).unwrap();
        assert_eq!(keep(&x, &values), vec![0]);

        let regex =
            build_predicate(ColumnKind::Textual, &Constraint::Textual("^4\\d$".into())).unwrap();
        assert_eq!(keep(&regex, &values), vec![2]);
    }

    #[test]
    fn invalid_regex_matches_literally() {
        let values = vec![
            CellValue::String("a(b".into()),
            CellValue::String("ab".into()),
        ];
        let pred = build_predicate(ColumnKind::Textual, &Constraint::Textual("a(".into())).unwrap();
        assert_eq!(keep(&pred, &values), vec![0]);
    }

    #[test]
    fn mismatched_kind_builds_nothing() {
        assert!(build_predicate(ColumnKind::Numeric, &Constraint::Textual("x".into())).is_none());
    }

    #[test]
    fn bounds_and_step() {
        let col = Column::new(
            "eRT",
            vec![CellValue::Float(-2.0), CellValue::Null, CellValue::Float(8.0)],
        );
        let b = NumericBounds::of(&col).unwrap();
        assert_eq!((b.min, b.max), (-2.0, 8.0));
        assert_eq!(b.step(), 0.1);

        let dates = Column::new(
            "d",
            vec![CellValue::DateTime(day(3)), CellValue::DateTime(day(1))],
        );
        assert_eq!(temporal_bounds(&dates), Some((day(1), day(3))));
    }
}
