// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with *some* `content` and a [link][ref].\n\n\
                - Bullet point\n    - Nested item\n- Another item\n\n> Quoted **text**\n> over two lines\n\n\
                    indented code\n\n[ref]: http://example.com \"Example\"\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_nested_quotes(depth: usize) -> String {
    format!("{}deep\n", "> ".repeat(depth))
}

/// Runs of emphasis markers that never close.
#[allow(dead_code)]
pub fn generate_unclosed_emphasis(count: usize) -> String {
    format!("{}end\n", "*a **b ".repeat(count))
}

/// Opening brackets with no `]` anywhere after them.
#[allow(dead_code)]
pub fn generate_unclosed_brackets(count: usize) -> String {
    format!("{}end\n", "[a ".repeat(count))
}

#[allow(dead_code)]
pub fn generate_table(rows: usize) -> String {
    let mut content = String::from("| name | value |\n|:-----|------:|\n");
    for row in 0..rows {
        content.push_str(&format!("| item {row} | {} |\n", row * 7));
    }
    content
}
