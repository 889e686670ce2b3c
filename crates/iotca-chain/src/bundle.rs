//! Splitting a PEM trust bundle into individual certificate blocks.
//!
//! The tokenizer is a three-state machine over the delimiter pair:
//!
//! ```text
//! Searching --BEGIN found--> InBlock --END found--> Emitted --> Searching
//!     |                         |
//!     +-- end of input: done    +-- end of input or nested BEGIN: MalformedBundle
//! ```
//!
//! Text outside a block (whitespace, comments, stray `END` lines) is skipped.

use crate::error::{ChainError, Result};

const BEGIN: &[u8] = b"-----BEGIN CERTIFICATE-----";
const END: &[u8] = b"-----END CERTIFICATE-----";

#[derive(Debug, Clone, Copy)]
enum State {
    /// Looking for the next `BEGIN` at or after `from`
    Searching { from: usize },
    /// Inside a block whose `BEGIN` starts at `start`
    InBlock { start: usize },
    /// A block ending just before `next` was pushed
    Emitted { next: usize },
}

/// Split `input` into PEM strings, one per certificate, in bundle order.
///
/// Each returned string runs from its `BEGIN CERTIFICATE` delimiter through
/// its `END CERTIFICATE` delimiter, byte for byte. An input with no blocks
/// yields an empty vector.
pub fn split_bundle(input: &[u8]) -> Result<Vec<String>> {
    let mut blocks = Vec::new();
    let mut state = State::Searching { from: 0 };

    loop {
        state = match state {
            State::Searching { from } => match find(input, BEGIN, from) {
                Some(start) => State::InBlock { start },
                None => break,
            },
            State::InBlock { start } => {
                let body = start + BEGIN.len();
                let end = find(input, END, body)
                    .ok_or(ChainError::MalformedBundle { offset: start })?;
                if find(input, BEGIN, body).is_some_and(|nested| nested < end) {
                    return Err(ChainError::MalformedBundle { offset: start });
                }

                let next = end + END.len();
                blocks.push(String::from_utf8_lossy(&input[start..next]).into_owned());
                State::Emitted { next }
            }
            State::Emitted { next } => State::Searching { from: next },
        };
    }

    Ok(blocks)
}

/// Position of the first `needle` in `haystack` at or after `from`
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "-----BEGIN CERTIFICATE-----\nQUFB\n-----END CERTIFICATE-----";
    const B: &str = "-----BEGIN CERTIFICATE-----\nQkJC\nQkJC\n-----END CERTIFICATE-----";

    #[test]
    fn empty_input_has_no_blocks() {
        assert!(split_bundle(b"").unwrap().is_empty());
        assert!(split_bundle(b"\n\n   \n").unwrap().is_empty());
    }

    #[test]
    fn keeps_order_and_delimiters() {
        let input = format!("{A}\n{B}\n");
        let blocks = split_bundle(input.as_bytes()).unwrap();
        assert_eq!(blocks, [A, B]);
    }

    #[test]
    fn tolerates_arbitrary_separators() {
        let input = format!("\r\n\r\n{A}   \n\n\t\n# second\n{B}");
        let blocks = split_bundle(input.as_bytes()).unwrap();
        assert_eq!(blocks, [A, B]);
    }

    #[test]
    fn back_to_back_blocks_are_lossless() {
        let input = format!("{A}{B}");
        let blocks = split_bundle(input.as_bytes()).unwrap();
        assert_eq!(blocks.concat(), input);
    }

    #[test]
    fn unterminated_block_is_malformed() {
        let input = format!("{A}\n\n-----BEGIN CERTIFICATE-----\nQUFB\n");
        let err = split_bundle(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ChainError::MalformedBundle { offset } if offset == A.len() + 2));
    }

    #[test]
    fn nested_begin_is_malformed() {
        let input = format!("-----BEGIN CERTIFICATE-----\nQUFB\n{B}");
        let err = split_bundle(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ChainError::MalformedBundle { offset: 0 }));
    }

    #[test]
    fn stray_end_delimiter_is_ignored() {
        let input = format!("-----END CERTIFICATE-----\n{A}");
        assert_eq!(split_bundle(input.as_bytes()).unwrap(), [A]);
    }
}
