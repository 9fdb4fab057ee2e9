//! Intervals command implementation.

use anyhow::Result;
use tickscan_types::Interval;

/// Print the supported candle intervals.
pub(crate) fn list_intervals() -> Result<()> {
    println!("{:<8} {:>14} {:>10}", "NAME", "MILLIS", "MINUTES");
    println!("{}", "-".repeat(34));

    for interval in Interval::all() {
        println!(
            "{:<8} {:>14} {:>10}",
            interval.as_str(),
            interval.millis(),
            interval.millis() / 60_000
        );
    }
    Ok(())
}
