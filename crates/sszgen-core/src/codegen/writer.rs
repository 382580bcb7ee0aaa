/// Line-oriented source writer with block indentation.
#[derive(Debug, Default)]
pub struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    pub fn indented(indent: usize) -> Self {
        Writer {
            out: String::new(),
            indent,
        }
    }

    pub fn line(&mut self, s: &str) {
        if s.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Writes `head {` and indents.
    pub fn open(&mut self, head: &str) {
        self.line(&format!("{head} {{"));
        self.indent += 1;
    }

    pub fn close(&mut self) {
        self.close_with("}");
    }

    /// Dedents and writes `tail`, e.g. `};` or `} else {`.
    pub fn close_with(&mut self, tail: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(tail);
    }

    /// `if cond { return Err(SszError::Kind); }`
    pub fn guard(&mut self, cond: &str, error: &str) {
        self.open(&format!("if {cond}"));
        self.line(&format!("return Err(SszError::{error});"));
        self.close();
    }

    pub fn finish(self) -> String {
        self.out
    }
}
