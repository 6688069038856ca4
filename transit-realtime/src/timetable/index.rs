//! Stop-major sorted row indices for timetable search.
//!
//! For every stop the index holds the timetable's row numbers sorted by
//! departure (and, separately, by arrival) at that stop. Ties are broken by
//! row number so the order is total and linear scans agree with binary
//! search. When every stop has the same order, which is the case for
//! patterns where no trip overtakes another, a single array is shared by
//! all stops. The arrivals index reuses the departures arrays whenever the
//! contents are equal.

use std::sync::Arc;

use crate::domain::{ServiceTime, TripSchedule};

/// Row numbers sorted per stop. One entry means "same order at all stops".
#[derive(Debug, Clone, PartialEq, Eq)]
struct SortedRows(Vec<Arc<[u32]>>);

impl SortedRows {
    fn build(
        num_stops: usize,
        num_rows: usize,
        time_at: impl Fn(usize, usize) -> ServiceTime,
    ) -> Self {
        let mut per_stop: Vec<Arc<[u32]>> = Vec::with_capacity(num_stops);
        for stop in 0..num_stops {
            let mut rows: Vec<u32> = (0..num_rows as u32).collect();
            rows.sort_by_key(|&r| (time_at(r as usize, stop), r));
            let rows: Arc<[u32]> = rows.into();
            let rows = match per_stop.last() {
                Some(prev) if **prev == *rows => Arc::clone(prev),
                _ => rows,
            };
            per_stop.push(rows);
        }

        let first = per_stop.first().cloned();
        match first {
            Some(first) if per_stop.iter().all(|rows| Arc::ptr_eq(rows, &first)) => {
                Self(vec![first])
            }
            _ => Self(per_stop),
        }
    }

    fn at(&self, stop: usize) -> &[u32] {
        if self.0.len() == 1 {
            &self.0[0]
        } else {
            &self.0[stop]
        }
    }

    fn same_contents(&self, other: &SortedRows) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }
}

/// Sorted departure and arrival indices over a fixed set of rows.
#[derive(Debug, Clone)]
pub(crate) struct TripIndex {
    departures: SortedRows,
    arrivals: SortedRows,
}

impl TripIndex {
    pub(crate) fn build(num_stops: usize, trips: &[Arc<TripSchedule>]) -> Self {
        let departures =
            SortedRows::build(num_stops, trips.len(), |row, stop| trips[row].departure(stop));
        let arrivals =
            SortedRows::build(num_stops, trips.len(), |row, stop| trips[row].arrival(stop));
        let arrivals = if arrivals.same_contents(&departures) {
            departures.clone()
        } else {
            arrivals
        };
        Self {
            departures,
            arrivals,
        }
    }

    /// Rows sorted by `(departure at stop, row)`.
    pub(crate) fn departures_at(&self, stop: usize) -> &[u32] {
        self.departures.at(stop)
    }

    /// Rows sorted by `(arrival at stop, row)`.
    pub(crate) fn arrivals_at(&self, stop: usize) -> &[u32] {
        self.arrivals.at(stop)
    }

    /// Whether a single departure order serves every stop.
    pub(crate) fn is_fifo(&self) -> bool {
        self.departures.0.len() == 1
    }

    /// Whether the arrival arrays are the departure arrays.
    pub(crate) fn shares_arrivals(&self) -> bool {
        self.departures
            .0
            .iter()
            .zip(&self.arrivals.0)
            .all(|(d, a)| Arc::ptr_eq(d, a))
            && self.departures.0.len() == self.arrivals.0.len()
    }
}
