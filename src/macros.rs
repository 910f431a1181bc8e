/// Poor man's `info!`: prints a timestamped line to stdout.
/// Pass a starting time as the first argument to also print the elapsed time.
/// Expects `chrono::Local` to be in scope at the call site.
/// ```ignore
/// info_time!("discovered {} disciplines", n);
/// let start = Local::now();
/// info_time!(start, "finished the walk");
/// ```
#[macro_export]
macro_rules! info_time {
    ($fmt:literal $(,)? $($arg:expr),*) => {{
        println!("{:<30} : {}", Local::now(), format!($fmt, $($arg),*));
    }};
    ($start:expr, $fmt:literal $(,)? $($arg:expr),*) => {{
        let now = Local::now();
        let secs = (now - $start).num_milliseconds() as f64 / 1_000.0;
        println!("{:<30} : {} [{secs:.3} sec]", now, format!($fmt, $($arg),*));
    }};
}
