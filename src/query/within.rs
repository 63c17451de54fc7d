//! Positional containment between a container operand and an embedded one.

use crate::error::Result;
use crate::query::node::{WithinEmit, WithinMode};
use crate::query::spans::{align, concat_payload, DocCursor, DocMatcher};
use crate::types::{DocId, PositionSpan};

pub struct WithinMatcher {
    container: DocCursor,
    embedded: DocCursor,
    mode: WithinMode,
    emit: WithinEmit,
}

impl WithinMatcher {
    pub fn new(container: DocCursor, embedded: DocCursor, mode: WithinMode, emit: WithinEmit) -> Self {
        Self {
            container,
            embedded,
            mode,
            emit,
        }
    }
}

impl WithinMode {
    pub fn holds(&self, container: &PositionSpan, embedded: &PositionSpan) -> bool {
        match self {
            WithinMode::Contains => container.contains(embedded),
            WithinMode::StartsWith => {
                container.start == embedded.start && embedded.end <= container.end
            }
            WithinMode::EndsWith => {
                container.end == embedded.end && container.start <= embedded.start
            }
            WithinMode::Match => container.same_position(embedded),
            WithinMode::Overlaps => container.overlaps(embedded),
        }
    }
}

pub fn within_matches(
    containers: &[PositionSpan],
    embedded: &[PositionSpan],
    mode: WithinMode,
    emit: WithinEmit,
) -> Vec<PositionSpan> {
    let mut matches = Vec::new();
    for c in containers {
        for e in embedded.iter().filter(|e| mode.holds(c, e)) {
            let (kept, other) = match emit {
                WithinEmit::Container => (c, e),
                WithinEmit::Embedded => (e, c),
            };
            matches.push(PositionSpan::with_payload(
                kept.doc,
                kept.start,
                kept.end,
                concat_payload(kept, other),
            ));
        }
    }
    matches.sort();
    matches.dedup();
    matches
}

impl DocMatcher for WithinMatcher {
    fn match_from(&mut self, mut target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        loop {
            let Some(doc) = align(&mut [&mut self.container, &mut self.embedded], target)? else {
                return Ok(None);
            };
            let containers = self.container.take_doc()?;
            let embedded = self.embedded.take_doc()?;
            let matches = within_matches(&containers, &embedded, self.mode, self.emit);
            if !matches.is_empty() {
                return Ok(Some(matches));
            }
            target = doc.saturating_add(1);
        }
    }

    fn cost(&self) -> u64 {
        self.container.cost().min(self.embedded.cost())
    }
}
