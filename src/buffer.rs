use tracing::{debug, warn};

/// Mutable line-oriented view of the target file.
///
/// Every stored line ends with a single `\n`; the buffer is empty only when
/// the source is empty. All mutation goes through [`LineBuffer::splice_at`],
/// which keeps that invariant for inserted payloads, so a later splice can
/// never join two lines by accident.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    lines: Vec<String>,
}

impl LineBuffer {
    pub fn new(source: &str) -> Self {
        let lines = source
            .split_inclusive('\n')
            .map(normalize_line_terminator)
            .collect();
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// Inserts the payload blocks before the given 0-based line index.
    /// Out-of-range positions are clamped to the nearest valid bound. Each
    /// block may span multiple lines; blocks are split and every resulting
    /// line is normalized to end with a line terminator.
    pub fn splice_at(&mut self, position: usize, payload: &[String]) {
        let clamped = position.min(self.lines.len());
        if clamped != position {
            debug!(
                requested = position,
                clamped,
                lines = self.lines.len(),
                "splice position clamped to buffer bounds"
            );
        }

        let inserted: Vec<String> = payload
            .iter()
            .flat_map(|block| block.split_inclusive('\n'))
            .map(normalize_line_terminator)
            .collect();
        self.lines.splice(clamped..clamped, inserted);
    }

    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

fn normalize_line_terminator(line: &str) -> String {
    if line.ends_with('\n') {
        return line.to_string();
    }
    let mut normalized = line.trim_end_matches('\r').to_string();
    normalized.push('\n');
    normalized
}

/// Leading whitespace of a line, excluding the terminator.
pub fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end].trim_end_matches(['\r', '\n'])
}

/// One indentation level in the style already used by `indent`: a tab when
/// the surrounding indentation is tab-based, four spaces otherwise.
pub fn indent_unit(indent: &str) -> &'static str {
    if indent.contains('\t') { "\t" } else { "    " }
}

/// The longest whitespace prefix shared by every non-blank line.
pub fn common_indent(snippet: &str) -> &str {
    let mut prefix: Option<&str> = None;
    for line in snippet.split('\n') {
        if line.trim().is_empty() {
            continue;
        }
        let indent = leading_whitespace(line);
        prefix = Some(match prefix {
            None => indent,
            Some(current) => {
                let shared = current
                    .char_indices()
                    .zip(indent.chars())
                    .take_while(|((_, a), b)| a == b)
                    .count();
                &current[..shared]
            }
        });
    }
    prefix.unwrap_or("")
}

/// Strips the common leading indentation from every line. Whitespace-only
/// lines are normalized to empty; the trailing-terminator shape of the
/// snippet is preserved.
pub fn dedent(snippet: &str) -> String {
    let prefix = common_indent(snippet).to_string();
    let parts: Vec<&str> = snippet.split('\n').collect();
    let dedented: Vec<&str> = parts
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.strip_prefix(prefix.as_str()).unwrap_or(line)
            }
        })
        .collect();
    dedented.join("\n")
}

/// Fully dedents the snippet, then prefixes every non-blank line with
/// `target_indent`. Blank lines are left untouched. The result always ends
/// with a line terminator.
pub fn reindent(snippet: &str, target_indent: &str) -> String {
    let mut indent = target_indent;
    if !indent.trim().is_empty() {
        warn!(
            indent = %target_indent,
            "target indentation contains non-whitespace; indenting with nothing"
        );
        indent = "";
    }

    let dedented = dedent(snippet);
    let lines: Vec<&str> = dedented.split('\n').collect();
    if !lines.iter().any(|line| !line.trim().is_empty()) {
        return "\n".repeat(lines.len().saturating_sub(1).max(1));
    }

    let reindented: Vec<String> = lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                (*line).to_string()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect();

    let mut result = reindented.join("\n");
    if !result.ends_with('\n') {
        result.push('\n');
    }
    result
}
