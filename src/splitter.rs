use regex::Regex;

pub const MARKER: &str = "DOSSIER";

/// One record's slice of the extracted text. `offset` is the byte position of
/// the slice in the text it was split from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordBlock<'a> {
    pub offset: usize,
    pub text: &'a str,
}

/// Cuts the text into record blocks.
///
/// The first block starts at the first `DOSSIER` in the text. Each following
/// block starts at a `DOSSIER` that opens a line (leading whitespace allowed,
/// including the `\x1c`-`\x1f` separators some extractors emit), and the
/// previous block ends right before the newline preceding it.
pub fn split_records(text: &str) -> Vec<RecordBlock<'_>> {
    let boundary = Regex::new(r"\n[\s\x1c-\x1f]*DOSSIER").expect("boundary pattern is valid");

    let mut blocks = Vec::new();
    let Some(mut start) = text.find(MARKER) else {
        return blocks;
    };

    loop {
        let body_start = start + MARKER.len();
        match boundary.find_at(text, body_start) {
            Some(m) => {
                blocks.push(RecordBlock {
                    offset: start,
                    text: &text[start..m.start()],
                });
                start = m.end() - MARKER.len();
            }
            None => {
                blocks.push(RecordBlock {
                    offset: start,
                    text: &text[start..],
                });
                return blocks;
            }
        }
    }
}
