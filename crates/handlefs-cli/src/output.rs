use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

/// Styled table with the given column headers
pub fn create_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

/// Format a byte size into a human-readable string
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.1}G", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1}M", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1}K", b as f64 / KB as f64),
        b => format!("{b}B"),
    }
}

/// Single-letter kind indicator, as in `ls -l`
pub fn format_entry_type(is_dir: bool) -> &'static str {
    if is_dir { "d" } else { "-" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_header() {
        let table = create_table(&["Type", "Name"]);
        let rendered = table.to_string();
        assert!(rendered.contains("Type"));
        assert!(rendered.contains("Name"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(12), "12B");
        assert_eq!(format_size(2048), "2.0K");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0M");
    }
}
