use std::mem;
use thiserror::Error;

// # Supported Syntax
// - whitespace: word separator
// - '...': literal text
// - "...": text with \" \\ \$ \` escapes
// - \c: escaped character outside of quotes

const SINGLE: u8 = 1;
const DOUBLE: u8 = 2;
const WORD: u8 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("command is empty")]
    Empty,
    #[error("unterminated {0} quote")]
    Unterminated(char),
    #[error("trailing escape character")]
    TrailingEscape,
}

/// Splits a command line into the argument vector that will be executed.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    let mut argv = Vec::new();
    let mut buffer = String::new();
    let mut flags = 0;
    let mut chars = input.chars();

    while let Some(character) = chars.next() {
        match character {
            '\'' if flags & DOUBLE == 0 => flags = (flags ^ SINGLE) | WORD,
            '"' if flags & SINGLE == 0 => flags = (flags ^ DOUBLE) | WORD,
            '\\' if flags & SINGLE == 0 => match chars.next() {
                Some(next) => {
                    if flags & DOUBLE != 0 && !matches!(next, '"' | '\\' | '$' | '`') {
                        buffer.push('\\');
                    }
                    buffer.push(next);
                    flags |= WORD;
                }
                None => return Err(TokenizeError::TrailingEscape),
            },
            _ if character.is_whitespace() && flags & (SINGLE | DOUBLE) == 0 => {
                if flags & WORD != 0 {
                    argv.push(mem::take(&mut buffer));
                    flags &= !WORD;
                }
            }
            _ => {
                buffer.push(character);
                flags |= WORD;
            }
        }
    }

    if flags & SINGLE != 0 {
        return Err(TokenizeError::Unterminated('\''));
    } else if flags & DOUBLE != 0 {
        return Err(TokenizeError::Unterminated('"'));
    }

    // Take care of any stragglers left behind.
    if flags & WORD != 0 {
        argv.push(buffer);
    }

    if argv.is_empty() {
        Err(TokenizeError::Empty)
    } else {
        Ok(argv)
    }
}
