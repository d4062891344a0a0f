
/// A validated input sequence; lives for one request
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SequenceRecord {
    /// First whitespace token of the header, unique within the request
    id: String,
    /// Full header line without the `>`
    header: String,
    /// Nucleotides, non-empty and unique within the request
    sequence: String
}

impl SequenceRecord {
    pub fn new(id: String, header: String, sequence: String) -> Self {
        Self { id, header, sequence }
    }

    // getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }
}
