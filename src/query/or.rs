//! Union of any number of operands.

use crate::error::Result;
use crate::query::spans::{DocCursor, DocMatcher};
use crate::types::{DocId, PositionSpan};

pub struct OrMatcher {
    children: Vec<DocCursor>,
}

impl OrMatcher {
    pub fn new(children: Vec<DocCursor>) -> Self {
        Self { children }
    }
}

impl DocMatcher for OrMatcher {
    fn match_from(&mut self, target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        let mut doc: Option<DocId> = None;
        for child in self.children.iter_mut() {
            if let Some(found) = child.seek(target)? {
                doc = Some(doc.map_or(found, |d| d.min(found)));
            }
        }
        let Some(doc) = doc else {
            return Ok(None);
        };
        let mut spans = Vec::new();
        for child in self.children.iter_mut() {
            if child.doc() == Some(doc) {
                spans.extend(child.take_doc()?);
            }
        }
        Ok(Some(spans))
    }

    fn cost(&self) -> u64 {
        self.children.iter().map(|c| c.cost()).sum()
    }
}
