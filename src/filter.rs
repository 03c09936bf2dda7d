//! Entity and date-range filtering over the clean dataset.
//!
//! A row is in the working subset iff its entity is in the selected set AND
//! its date lies in the inclusive range. An empty set or a reversed range
//! selects nothing; no bound is ever swapped here.

use crate::error::PipelineResult;
use crate::schema::{date_to_days, DATE, ENTITY};
use crate::store::CleanDataset;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// Inclusive date range. `start > end` is representable and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Keeps the bounds exactly as given.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The same range with reversed bounds swapped, for callers that want to
    /// be forgiving about input order.
    pub fn normalized(&self) -> Self {
        if self.is_reversed() {
            Self::new(self.end, self.start)
        } else {
            *self
        }
    }

    /// Interprets a date-picker selection: two dates are a range, one date is
    /// that day, anything else falls back to `fallback`.
    pub fn from_selection(selection: &[NaiveDate], fallback: DateRange) -> Self {
        match selection {
            [start, end] => Self::new(*start, *end),
            [day] => Self::single(*day),
            _ => fallback,
        }
    }
}

/// The predicates of one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub entities: BTreeSet<String>,
    pub date_range: DateRange,
}

impl FilterSpec {
    pub fn new<I, S>(entities: I, date_range: DateRange) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
            date_range,
        }
    }

    /// Every entity and the full date span of `dataset`. `None` when the
    /// dataset is empty and so has no date bounds.
    pub fn all(dataset: &CleanDataset) -> PipelineResult<Option<Self>> {
        let Some((start, end)) = dataset.date_bounds()? else {
            return Ok(None);
        };
        Ok(Some(Self::new(dataset.entities()?, DateRange::new(start, end))))
    }

    /// True when no row can match, whatever the dataset.
    pub fn selects_nothing(&self) -> bool {
        self.entities.is_empty() || self.date_range.is_reversed()
    }

    fn predicate(&self) -> Expr {
        let entity = self
            .entities
            .iter()
            .map(|e| col(ENTITY).eq(lit(e.as_str())))
            .reduce(|acc, e| acc.or(e))
            .unwrap_or_else(|| lit(false));
        let days = col(DATE).cast(DataType::Int32);
        let start = lit(date_to_days(self.date_range.start));
        let end = lit(date_to_days(self.date_range.end));
        entity
            .and(days.clone().gt_eq(start))
            .and(days.lt_eq(end))
    }
}

/// Rows of the clean dataset that pass a [`FilterSpec`], as a lazy plan.
/// Nothing is materialized until a view collects it.
#[derive(Clone)]
pub struct WorkingSubset {
    lf: LazyFrame,
    spec: FilterSpec,
}

impl WorkingSubset {
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn lazy(&self) -> LazyFrame {
        self.lf.clone()
    }

    pub fn collect(&self) -> PipelineResult<DataFrame> {
        Ok(self.lf.clone().collect()?)
    }

    pub fn row_count(&self) -> PipelineResult<usize> {
        if self.spec.selects_nothing() {
            return Ok(0);
        }
        let counted = self.lf.clone().select([len().alias("count")]).collect()?;
        let count = counted
            .column("count")?
            .cast(&DataType::UInt64)?
            .u64()?
            .get(0)
            .unwrap_or(0);
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> PipelineResult<bool> {
        Ok(self.row_count()? == 0)
    }
}

/// Builds the working subset for `spec`. The dataset is never modified.
pub fn filter(dataset: &CleanDataset, spec: &FilterSpec) -> WorkingSubset {
    if spec.entities.is_empty() {
        tracing::warn!("entity set is empty; the working subset is empty");
    }
    if spec.date_range.is_reversed() {
        tracing::warn!(
            start = %spec.date_range.start,
            end = %spec.date_range.end,
            "date range is reversed; the working subset is empty"
        );
    }
    tracing::debug!(
        entities = spec.entities.len(),
        start = %spec.date_range.start,
        end = %spec.date_range.end,
        "building working subset"
    );

    let lf = if spec.selects_nothing() {
        dataset.lazy().filter(lit(false))
    } else {
        dataset.lazy().filter(spec.predicate())
    };
    WorkingSubset {
        lf,
        spec: spec.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 2, d).unwrap()
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let r = DateRange::new(day(17), day(20));
        assert!(r.contains(day(17)));
        assert!(r.contains(day(20)));
        assert!(!r.contains(day(21)));
        assert!(!r.is_reversed());
    }

    #[test]
    fn reversed_range_contains_nothing() {
        let r = DateRange::new(day(20), day(17));
        assert!(r.is_reversed());
        assert!(!r.contains(day(18)));
        assert_eq!(r.normalized(), DateRange::new(day(17), day(20)));
    }

    #[test]
    fn selection_follows_date_picker_rules() {
        let fallback = DateRange::new(day(16), day(24));
        assert_eq!(
            DateRange::from_selection(&[day(18), day(19)], fallback),
            DateRange::new(day(18), day(19))
        );
        assert_eq!(
            DateRange::from_selection(&[day(18)], fallback),
            DateRange::single(day(18))
        );
        assert_eq!(DateRange::from_selection(&[], fallback), fallback);
        assert_eq!(
            DateRange::from_selection(&[day(17), day(18), day(19)], fallback),
            fallback
        );
    }

    #[test]
    fn empty_entity_set_selects_nothing() {
        let spec = FilterSpec::new(Vec::<String>::new(), DateRange::new(day(17), day(20)));
        assert!(spec.selects_nothing());
        let spec = FilterSpec::new(["United"], DateRange::new(day(20), day(17)));
        assert!(spec.selects_nothing());
        let spec = FilterSpec::new(["United"], DateRange::single(day(17)));
        assert!(!spec.selects_nothing());
    }
}
