use std::iter::Peekable;
use std::str::Lines;

/// One device in the enumerator output: an unindented header and its indented detail lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Block<'a> {
    pub header: &'a str,
    pub details: Vec<&'a str>,
}

fn is_detail(line: &str) -> bool {
    line.starts_with('\t') || line.starts_with(' ')
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Lazily splits enumerator output into device blocks.
pub struct Blocks<'a> {
    lines: Peekable<Lines<'a>>,
}

pub fn split_blocks(text: &str) -> Blocks<'_> {
    Blocks {
        lines: text.lines().peekable(),
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let header = loop {
            let line = self.lines.next()?;
            if is_blank(line) {
                continue;
            }
            if is_detail(line) {
                log::trace!("block: dropping detail line without a header: {:?}", line);
                continue;
            }
            break line;
        };

        let mut details = Vec::new();
        while let Some(line) = self.lines.next_if(|line| is_blank(line) || is_detail(line)) {
            if !is_blank(line) {
                details.push(line);
            }
        }

        Some(Block { header, details })
    }
}
