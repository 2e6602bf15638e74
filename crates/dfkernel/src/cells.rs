//! ファイルをセルに分ける
//!
//! `# %%` で始まる行があればそれを区切りにし、無ければ空行で区切る。

const CELL_MARKER: &str = "# %%";

pub fn split_cells(source: &str) -> Vec<String> {
    let has_markers = source.lines().any(is_marker);
    let mut cells = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in source.lines() {
        let boundary = if has_markers {
            is_marker(line)
        } else {
            line.trim().is_empty()
        };
        if boundary {
            flush(&mut cells, &mut current);
        } else {
            current.push(line);
        }
    }
    flush(&mut cells, &mut current);

    cells
}

fn is_marker(line: &str) -> bool {
    line.trim_start().starts_with(CELL_MARKER)
}

fn flush(cells: &mut Vec<String>, current: &mut Vec<&str>) {
    let cell = current.join("\n");
    let cell = cell.trim();
    if !cell.is_empty() {
        cells.push(cell.to_string());
    }
    current.clear();
}
