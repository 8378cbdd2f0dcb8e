//! Statistics Accumulator

use crate::common::{max, min};
use num_traits::{Num, Zero};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::AddAssign;
use std::sync::{Mutex, OnceLock};

/// Return the global statistics accumulator.
pub fn stats_accumulator() -> &'static Mutex<StatsAccumulator> {
    static DATA: OnceLock<Mutex<StatsAccumulator>> = OnceLock::new();
    DATA.get_or_init(|| Mutex::new(StatsAccumulator::new()))
}

/// Distribution statistic.
#[derive(Default, Clone, Debug)]
pub struct StatsDistribution<T>
where
    T: Num + Default + Copy + Clone,
{
    /// Sum of all values.
    sum: T,

    /// Count of all values.
    count: u64,

    /// Minimum value.
    min: Option<T>,

    /// Maximum value.
    max: Option<T>,
}

impl<T> StatsDistribution<T>
where
    T: Num + Zero + PartialOrd + AddAssign + Default + Copy + Clone,
{
    /// Accumulate another distribution.
    ///
    /// * `distrib` - The distribution to merge.
    pub fn accumulate(&mut self, distrib: Self) {
        self.sum += distrib.sum;
        self.count += distrib.count;
        self.min = merge_option(self.min, distrib.min, min);
        self.max = merge_option(self.max, distrib.max, max);
    }

    /// Report a sample value.
    ///
    /// * `val`  - Sample value.
    pub fn report(&mut self, val: T) {
        self.sum += val;
        self.count += 1;
        self.min = Some(self.min.map_or(val, |v| min(v, val)));
        self.max = Some(self.max.map_or(val, |v| max(v, val)));
    }

    /// Clear stats.
    pub fn clear(&mut self) {
        self.sum = T::zero();
        self.count = 0;
        self.min = None;
        self.max = None;
    }

    /// Returns the number of samples.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the sum of samples.
    pub fn sum(&self) -> T {
        self.sum
    }

    /// Returns the smallest sample.
    pub fn min(&self) -> Option<T> {
        self.min
    }

    /// Returns the largest sample.
    pub fn max(&self) -> Option<T> {
        self.max
    }
}

/// Combines two optional values with `f`, keeping whichever one is present.
fn merge_option<T: Copy>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Aggregate different types of statistics.
#[derive(Default)]
pub struct StatsAccumulator {
    /// Counters.
    counters: HashMap<String, i64>,

    /// Integer distribution.
    int_distribution: HashMap<String, StatsDistribution<i64>>,

    /// Float distribution.
    float_distribution: HashMap<String, StatsDistribution<f64>>,

    /// Percentages.
    percentages: HashMap<String, (i64, i64)>,
}

impl StatsAccumulator {
    /// Create a new instance of `StatsAccumulator`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates a counter value.
    ///
    /// * `name` - Statistic name.
    /// * `val`  - Counter value.
    pub fn report_counter(&mut self, name: &str, val: i64) {
        *self.counters.entry(name.to_string()).or_insert(0) += val;
    }

    /// Accumulates integer distribution samples.
    ///
    /// * `name`    - Statistic name.
    /// * `distrib` - Distribution.
    pub fn report_int_distribution(&mut self, name: &str, distrib: StatsDistribution<i64>) {
        self.int_distribution
            .entry(name.to_string())
            .or_default()
            .accumulate(distrib);
    }

    /// Accumulates floating point distribution samples.
    ///
    /// * `name`    - Statistic name.
    /// * `distrib` - Distribution.
    pub fn report_float_distribution(&mut self, name: &str, distrib: StatsDistribution<f64>) {
        self.float_distribution
            .entry(name.to_string())
            .or_default()
            .accumulate(distrib);
    }

    /// Accumulates a percentage value.
    ///
    /// * `name`  - Statistic name.
    /// * `num`   - Numerator (actual count).
    /// * `denom` - Denominator (total count).
    pub fn report_percentage(&mut self, name: &str, num: i64, denom: i64) {
        let v = self.percentages.entry(name.to_string()).or_insert((0, 0));
        v.0 += num;
        v.1 += denom;
    }

    /// Returns an accumulated counter.
    ///
    /// * `name` - Statistic name.
    pub fn counter(&self, name: &str) -> Option<i64> {
        self.counters.get(name).copied()
    }

    /// Returns an accumulated percentage as `(numerator, denominator)`.
    ///
    /// * `name` - Statistic name.
    pub fn percentage(&self, name: &str) -> Option<(i64, i64)> {
        self.percentages.get(name).copied()
    }

    /// Returns an accumulated floating point distribution.
    ///
    /// * `name` - Statistic name.
    pub fn float_distribution(&self, name: &str) -> Option<&StatsDistribution<f64>> {
        self.float_distribution.get(name)
    }

    /// Prints the report.
    pub fn print(&self) {
        println!("{self}");
    }

    /// Clear the accumulated statistics.
    pub fn clear(&mut self) {
        self.counters.clear();
        self.int_distribution.clear();
        self.float_distribution.clear();
        self.percentages.clear();
    }

    /// Formats every non-empty statistic and groups the lines by category.
    fn lines_by_category(&self) -> BTreeMap<String, Vec<String>> {
        let mut to_print: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut push = |name: &str, line: &dyn Fn(&str) -> String| {
            let (category, title) = get_category_and_title(name);
            to_print.entry(category).or_default().push(line(&title));
        };

        for (k, &v) in self.counters.iter().filter(|(_, v)| **v != 0) {
            push(k, &|title| format!("{title:-42}               {v:12}"));
        }

        for (k, v) in self.int_distribution.iter().filter(|(_, v)| v.count > 0) {
            let avg = v.sum as f64 / v.count as f64;
            let (mn, mx) = (v.min.unwrap_or(0), v.max.unwrap_or(0));
            push(k, &|title| format!("{title:-42}                      {avg:.3} avg [range {mn} - {mx}]"));
        }

        for (k, v) in self.float_distribution.iter().filter(|(_, v)| v.count > 0) {
            let avg = v.sum / v.count as f64;
            let (mn, mx) = (v.min.unwrap_or(0.0), v.max.unwrap_or(0.0));
            push(k, &|title| format!("{title:-42}                      {avg:.3} avg [range {mn:.3} - {mx:.3}]"));
        }

        for (k, &(num, denom)) in self.percentages.iter().filter(|(_, (_, d))| *d != 0) {
            let pct = (100.0 * num as f64) / denom as f64;
            push(k, &|title| format!("{title:-42}{num:12} / {denom:12} ({pct:.2}%)"));
        }

        for lines in to_print.values_mut() {
            lines.sort();
        }
        to_print
    }
}

impl fmt::Display for StatsAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics:")?;
        for (category, items) in self.lines_by_category() {
            writeln!(f, "  {category}")?;
            for item in items {
                writeln!(f, "    {item}")?;
            }
        }
        Ok(())
    }
}

/// Splits a statistic name at the first `/` as the separator and returns category and title. If there is no `/`, then
/// category is the empty string.
///
/// * `s` - The statistic name to split.
fn get_category_and_title(s: &str) -> (String, String) {
    match s.split_once('/') {
        Some((category, title)) => (category.to_string(), title.to_string()),
        None => (String::new(), s.to_string()),
    }
}
