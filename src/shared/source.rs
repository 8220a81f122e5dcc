use std::io::{BufRead, Read};
use tracing::{error, info};

/// Upper bound on a single physical read. Longer lines arrive as several
/// continuation fragments.
pub const LINE_LIMIT: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalLine {
    pub number:  u64,
    pub command: String,
}

/// Reads logical commands from a line-oriented input, skipping blank lines
/// and comments, and merging fragments that were cut by the read limit.
pub struct CommandSource<R> {
    reader:   R,
    limit:    usize,
    buffer:   Vec<u8>,
    fragment: Vec<u8>,
    lines:    u64,
    finished: bool,
}

impl<R: BufRead> CommandSource<R> {
    pub fn new(reader: R) -> CommandSource<R> { CommandSource::with_limit(reader, LINE_LIMIT) }

    pub fn with_limit(reader: R, limit: usize) -> CommandSource<R> {
        CommandSource {
            reader,
            limit: limit.max(1),
            buffer: Vec::with_capacity(limit.max(1)),
            fragment: Vec::new(),
            lines: 0,
            finished: false,
        }
    }

    /// Number of logical lines consumed so far, including skipped ones.
    pub fn lines(&self) -> u64 { self.lines }

    fn read_chunk(&mut self) -> bool {
        self.buffer.clear();
        let limit = self.limit as u64;
        match self.reader.by_ref().take(limit).read_until(b'\n', &mut self.buffer) {
            Ok(0) => false,
            Ok(_) => true,
            Err(why) => {
                error!("unable to read line from input: {}", why);
                false
            }
        }
    }

    fn complete(&mut self) -> LogicalLine {
        let mut line = std::mem::take(&mut self.fragment);
        line.extend_from_slice(&self.buffer);
        while let Some(b'\r') | Some(b'\n') = line.last() {
            line.pop();
        }

        LogicalLine {
            number:  self.lines,
            command: String::from_utf8_lossy(&line).into_owned(),
        }
    }
}

impl<R: BufRead> Iterator for CommandSource<R> {
    type Item = LogicalLine;

    fn next(&mut self) -> Option<LogicalLine> {
        while !self.finished {
            if !self.read_chunk() {
                self.finished = true;
                // An unterminated last line is still a line.
                if self.fragment.is_empty() {
                    return None;
                }
                self.buffer.clear();
            } else if self.buffer.last() != Some(&b'\n') {
                // Short reads without a newline only happen at the end of input.
                if self.buffer.len() == self.limit {
                    info!("continuation line {}", self.lines + 1);
                }
                self.fragment.extend_from_slice(&self.buffer);
                continue;
            }

            self.lines += 1;
            let first = self.fragment.first().or_else(|| self.buffer.first());
            if let Some(b'\r') | Some(b'\n') | Some(b'#') | None = first {
                self.fragment.clear();
                continue;
            }

            return Some(self.complete());
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandSource, LogicalLine};
    use std::io::Cursor;

    fn commands(input: &str, limit: usize) -> (Vec<LogicalLine>, u64) {
        let mut source = CommandSource::with_limit(Cursor::new(input.as_bytes().to_vec()), limit);
        let got = source.by_ref().collect();
        (got, source.lines())
    }

    fn line(number: u64, command: &str) -> LogicalLine {
        LogicalLine { number, command: command.into() }
    }

    #[test]
    fn skips_blank_and_comments() {
        let (got, lines) = commands("echo a\n\n# comment\r\n\r\necho b\r\n", 4096);
        assert_eq!(got, vec![line(1, "echo a"), line(5, "echo b")]);
        assert_eq!(lines, 5);
    }

    #[test]
    fn merges_fragments() {
        // A limit of 8 splits the first command into three physical reads.
        let (got, lines) = commands("/bin/echo hello world\ntrue\n", 8);
        assert_eq!(got, vec![line(1, "/bin/echo hello world"), line(2, "true")]);
        assert_eq!(lines, 2);
    }

    #[test]
    fn fragment_followed_by_terminator() {
        let (got, lines) = commands("12345678\n\n#x\n", 8);
        assert_eq!(got, vec![line(1, "12345678")]);
        assert_eq!(lines, 3);
    }

    #[test]
    fn long_comment() {
        let (got, lines) = commands("# a long comment\nls\n", 4);
        assert_eq!(got, vec![line(2, "ls")]);
        assert_eq!(lines, 2);
    }

    #[test]
    fn unterminated_tail() {
        let (got, lines) = commands("true\nfalse", 4096);
        assert_eq!(got, vec![line(1, "true"), line(2, "false")]);
        assert_eq!(lines, 2);

        let (got, _) = commands("abcdefghij", 4);
        assert_eq!(got, vec![line(1, "abcdefghij")]);
    }

    #[test]
    fn empty_input() {
        let (got, lines) = commands("", 4096);
        assert!(got.is_empty());
        assert_eq!(lines, 0);
    }
}
