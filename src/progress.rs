//! Project completion percentage.

/// Percentage of completed tasks, rounded half-up. An empty project is at 0.
pub fn progress(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((200 * completed + total) / (2 * total)) as u8
}
