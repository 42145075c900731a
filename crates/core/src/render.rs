use crate::table::Table;

/// Renders one tab-separated line per row, header first. This text is what
/// the answering model reads.
pub fn render_tsv(table: &Table) -> String {
    let mut output = String::new();
    for row in table.rows() {
        output.push_str(&row.cells().join("\t"));
        output.push('\n');
    }
    output
}
