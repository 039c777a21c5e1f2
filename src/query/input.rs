use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Consecutive blank lines that end line-by-line entry
const BLANKS_TO_FINISH: usize = 2;

/// Parses a query list: one query per line, blank lines ignored
pub fn parse_queries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads a query list from a file
///
/// # Arguments
///
/// * `path` - Path to a UTF-8 text file with one query per line
pub fn read_queries_file(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_queries(&content))
}

/// How queries are typed in at the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// One prompted query per line; two blank lines in a row finish
    LineByLine,

    /// A pasted block read until end of input
    Paste,
}

/// Reads queries typed at a terminal
///
/// Asks for an entry mode first (`2` selects paste, anything else line-by-line),
/// then collects queries. End of input always finishes entry.
///
/// # Arguments
///
/// * `input` - Where answers are read from (stdin in the binary)
/// * `output` - Where prompts are written (stdout in the binary)
pub fn read_queries_interactive<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
) -> std::io::Result<Vec<String>> {
    writeln!(output, "Enter search queries:")?;
    writeln!(output, "  1. One query per line, press Enter twice to finish")?;
    writeln!(output, "  2. Paste all queries, end with Ctrl+D")?;
    write!(output, "Mode (1/2, Enter = 1): ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let mode = match answer.trim() {
        "2" => EntryMode::Paste,
        _ => EntryMode::LineByLine,
    };

    let queries = match mode {
        EntryMode::Paste => {
            writeln!(output, "Paste queries, one per line:")?;
            output.flush()?;
            let mut content = String::new();
            input.read_to_string(&mut content)?;
            parse_queries(&content)
        }
        EntryMode::LineByLine => read_line_by_line(&mut input, &mut output)?,
    };

    writeln!(output, "Received {} queries", queries.len())?;
    Ok(queries)
}

fn read_line_by_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> std::io::Result<Vec<String>> {
    let mut queries = Vec::new();
    let mut blanks = 0;

    loop {
        write!(output, "Query {}: ", queries.len() + 1)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let query = line.trim();
        if query.is_empty() {
            blanks += 1;
            if blanks >= BLANKS_TO_FINISH {
                break;
            }
            continue;
        }

        blanks = 0;
        queries.push(query.to_string());
    }

    writeln!(output)?;
    Ok(queries)
}
