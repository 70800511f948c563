/// Format a minute count as "Xh Ym" (always both parts, e.g. "0h 0m", "2h 5m")
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
