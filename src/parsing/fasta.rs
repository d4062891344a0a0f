
/// One header and its concatenated sequence, as written in the input
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FastaEntry {
    /// Header text after the `>` marker, trimmed; may be empty
    pub header: String,
    /// All sequence lines until the next header, whitespace stripped and joined
    pub sequence: String
}

/// Result of parsing FASTA text; entries keep their input order and duplicates are preserved
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedFasta {
    entries: Vec<FastaEntry>,
    /// Non-blank lines found before the first header
    leading_lines: usize
}

impl ParsedFasta {
    pub fn entries(&self) -> &[FastaEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<FastaEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-blank lines that appeared before any header
    pub fn leading_lines(&self) -> usize {
        self.leading_lines
    }
}

/// Parses FASTA text. This never fails; structural problems are reported by the validator.
/// # Arguments
/// * `text` - raw FASTA text, possibly several files concatenated
pub fn parse_fasta(text: &str) -> ParsedFasta {
    let mut parsed = ParsedFasta::default();
    let mut current: Option<FastaEntry> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(header) = line.strip_prefix('>') {
            if let Some(entry) = current.take() {
                parsed.entries.push(entry);
            }
            current = Some(FastaEntry {
                header: header.trim().to_string(),
                sequence: String::new()
            });
        } else if line.is_empty() {
            continue;
        } else {
            match current.as_mut() {
                Some(entry) => {
                    entry.sequence.extend(line.chars().filter(|c| !c.is_whitespace()));
                },
                None => parsed.leading_lines += 1
            }
        }
    }

    if let Some(entry) = current.take() {
        parsed.entries.push(entry);
    }
    parsed
}

/// The sequence ID is the first whitespace-delimited token of the header.
pub fn sequence_id(header: &str) -> &str {
    header.split_whitespace().next().unwrap_or_default()
}
