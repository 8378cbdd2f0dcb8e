//! Macros

/// Create a thread local variable to track an `i64` counter across threads.
///
/// * `$title`      - Descriptive title of the statistic that uses `/` as a separator for categories.
///                   For example: "Raytracer/Rays traced",
/// * `$var`        - An identifier for the thread local variable.
/// * `$stats_func` - An identifier for the callback function used by `StatsRegistrar::call_stat_funcs()` to report to
///                   `StatsAccumulator`.
#[macro_export]
macro_rules! stat_counter {
    ($title: expr, $var: ident, $stats_func: ident $(,)?) => {
        thread_local! { pub(crate) static $var: std::cell::RefCell<i64> = std::cell::RefCell::new(0); }

        pub(crate) fn $stats_func(accum: &mut $crate::stats::StatsAccumulator) {
            let val = $var.with(|v| v.replace(0));
            accum.report_counter($title, val);
        }
    };
}

/// Create a thread local variable to track an integer distribution across threads.
///
/// * `$title`      - Descriptive title of the statistic that uses `/` as a separator for categories.
/// * `$var`        - An identifier for the thread local variable.
/// * `$stats_func` - An identifier for the reporting callback function.
#[macro_export]
macro_rules! stat_int_distribution {
    ($title: expr, $var: ident, $stats_func: ident $(,)?) => {
        thread_local! {
            pub(crate) static $var: std::cell::RefCell<$crate::stats::StatsDistribution<i64>> =
                std::cell::RefCell::new($crate::stats::StatsDistribution::default());
        }

        pub(crate) fn $stats_func(accum: &mut $crate::stats::StatsAccumulator) {
            let val = $var.with(|v| v.take());
            accum.report_int_distribution($title, val);
        }
    };
}

/// Create a thread local variable to track a float distribution across threads.
///
/// * `$title`      - Descriptive title of the statistic that uses `/` as a separator for categories.
/// * `$var`        - An identifier for the thread local variable.
/// * `$stats_func` - An identifier for the reporting callback function.
#[macro_export]
macro_rules! stat_float_distribution {
    ($title: expr, $var: ident, $stats_func: ident $(,)?) => {
        thread_local! {
            pub(crate) static $var: std::cell::RefCell<$crate::stats::StatsDistribution<f64>> =
                std::cell::RefCell::new($crate::stats::StatsDistribution::default());
        }

        pub(crate) fn $stats_func(accum: &mut $crate::stats::StatsAccumulator) {
            let val = $var.with(|v| v.take());
            accum.report_float_distribution($title, val);
        }
    };
}

/// Create thread local variables to track `i64` values for numerator/denominator as percentage across threads.
///
/// * `$title`      - Descriptive title of the statistic that uses `/` as a separator for categories.
/// * `$var_num`    - An identifier for the thread local variable for numerator (actual count).
/// * `$var_denom`  - An identifier for the thread local variable for denominator (total count).
/// * `$stats_func` - An identifier for the reporting callback function.
#[macro_export]
macro_rules! stat_percent {
    ($title: expr, $var_num: ident, $var_denom: ident, $stats_func: ident $(,)?) => {
        thread_local! {
            pub(crate) static $var_num: std::cell::RefCell<i64> = std::cell::RefCell::new(0);
            pub(crate) static $var_denom: std::cell::RefCell<i64> = std::cell::RefCell::new(0);
        }

        pub(crate) fn $stats_func(accum: &mut $crate::stats::StatsAccumulator) {
            let num = $var_num.with(|v| v.replace(0));
            let denom = $var_denom.with(|v| v.replace(0));
            accum.report_percentage($title, num, denom);
        }
    };
}

/// Convenience macro to increment a thread local variable for counter/percent statistics.
#[macro_export]
macro_rules! stat_inc {
    ($var: ident, $e: expr) => {
        $var.with(|v| *v.borrow_mut() += $e);
    };
}

/// Convenience macro to report a sample to a thread local int/float distribution statistic.
#[macro_export]
macro_rules! stat_dist {
    ($var: ident, $e: expr) => {
        $var.with(|v| v.borrow_mut().report($e));
    };
}

/// Convenience macro to register the callback functions for statistics. It defines a `register_stats()` function
/// for the calling module; call it from the constructor of the module's top-level type.
///
/// * `$($func: ident),+` - One or more callback functions created by the `stat_*` macros.
#[macro_export]
macro_rules! register_stats {
    ($($stat_func: ident),+ $(,)?) => {
        /// Registers the statistics of this module once.
        pub(crate) fn register_stats() {
            static REGISTERED: std::sync::Once = std::sync::Once::new();
            REGISTERED.call_once(|| {
                let mut sr = $crate::stats::stats_registrar()
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                $(
                    sr.register_stat_func($stat_func);
                )+
            });
        }
    };
}

/// Convenience macro to accumulate thread local statistics in the global `StatsAccumulator`. This calls the
/// registered callbacks created with `stat_*` macros. Call it at the end of each spawned worker thread and at the end
/// of a forward pass from the calling thread.
#[macro_export]
macro_rules! report_stats {
    () => {{
        let mut accum = $crate::stats::stats_accumulator()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        $crate::stats::stats_registrar()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .call_stat_funcs(&mut accum);
    }};
}

/// Convenience macro to print accumulated statistics in the global `StatsAccumulator`.
#[macro_export]
macro_rules! print_stats {
    () => {{
        $crate::stats::stats_accumulator()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .print();
    }};
}

/// Convenience macro to clear accumulated statistics in the global `StatsAccumulator`.
#[macro_export]
macro_rules! clear_stats {
    () => {{
        $crate::stats::stats_accumulator()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }};
}
