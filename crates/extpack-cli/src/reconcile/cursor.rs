//! Positional cursor over bundler outputs.

use std::collections::HashSet;

use extpack_manifest::paths::posix_path;

use crate::bundler::OutputRecord;

/// Walks outputs strictly forward, one addressable record at a time.
///
/// Records are never revisited: once the cursor moves past a record it is
/// out of reach for every later reference.
#[derive(Debug, Clone)]
pub(crate) struct OutputCursor<'a> {
    records: &'a [OutputRecord],
    position: usize,
    /// Companion assets already handed out.
    claimed: HashSet<usize>,
}

impl<'a> OutputCursor<'a> {
    pub(crate) fn new(records: &'a [OutputRecord]) -> Self {
        Self {
            records,
            position: 0,
            claimed: HashSet::new(),
        }
    }

    fn next_index(&self) -> Option<usize> {
        self.records[self.position..]
            .iter()
            .position(OutputRecord::is_addressable)
            .map(|offset| self.position + offset)
    }

    /// The next addressable record, without consuming it.
    pub(crate) fn peek(&self) -> Option<&'a OutputRecord> {
        self.next_index().map(|index| &self.records[index])
    }

    /// Consumes the record returned by [`Self::peek`].
    pub(crate) fn advance(&mut self) {
        self.position = match self.next_index() {
            Some(index) => index + 1,
            None => self.records.len(),
        };
    }

    /// Number of addressable records in the whole output list.
    pub(crate) fn addressable_len(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.is_addressable())
            .count()
    }

    /// Claims the first unclaimed file asset after the current record that
    /// satisfies `accept`.
    ///
    /// Wrapper entry points point at an asset the bundler reports separately,
    /// usually right after the wrapper. Claiming does not move the cursor.
    pub(crate) fn claim_companion(
        &mut self,
        accept: impl Fn(&OutputRecord) -> bool,
    ) -> Option<&'a OutputRecord> {
        let start = self.next_index()? + 1;
        let records = self.records;
        let index = (start..records.len()).find(|index| {
            let record = &records[*index];
            record.is_file_asset() && !self.claimed.contains(index) && accept(record)
        })?;
        self.claimed.insert(index);
        Some(&records[index])
    }

    /// Paths of every record not yet passed.
    pub(crate) fn remaining(&self) -> Vec<String> {
        self.records[self.position..]
            .iter()
            .map(|record| posix_path(&record.path))
            .collect()
    }
}
