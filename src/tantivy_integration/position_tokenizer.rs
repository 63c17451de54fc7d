//! Position-aware tokenizer for annotated fields.
//!
//! The indexed text of an annotated field lists the posting keys of every
//! token position. Positions are separated by `\u{1d}` and the keys of one
//! position by `\u{1c}`:
//!
//! ```text
//! s:Der \u{1c} <>:np\u{1f}e2 \u{1d} s:Hund \u{1d} s:bellt
//! ```
//!
//! Each key is emitted as one tantivy token carrying the index of its
//! position, so all annotations of a position share that position in the
//! postings. Empty positions still advance the position counter.

use tantivy::tokenizer::{Token, TokenStream, Tokenizer};

use crate::engine::constants::{ANNOTATION_SEPARATOR, POSITION_SEPARATOR};

pub struct AnnotationTokenStream {
    /// Posting keys per position
    keys: Vec<Vec<String>>,
    position: usize,
    key_index: usize,
    token: Token,
}

impl AnnotationTokenStream {
    pub fn new(keys: Vec<Vec<String>>) -> Self {
        Self {
            keys,
            position: 0,
            key_index: 0,
            token: Token::default(),
        }
    }
}

impl TokenStream for AnnotationTokenStream {
    fn advance(&mut self) -> bool {
        loop {
            let Some(keys) = self.keys.get(self.position) else {
                return false;
            };
            if let Some(key) = keys.get(self.key_index) {
                self.token.text.clear();
                self.token.text.push_str(key);
                self.token.position = self.position;
                self.token.offset_from = self.position;
                self.token.offset_to = self.position + 1;
                self.key_index += 1;
                return true;
            }
            self.position += 1;
            self.key_index = 0;
        }
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

#[derive(Clone)]
pub struct AnnotationTokenizer;

impl Tokenizer for AnnotationTokenizer {
    type TokenStream<'a> = AnnotationTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        let keys = if text.is_empty() {
            Vec::new()
        } else {
            text.split(POSITION_SEPARATOR)
                .map(|position| {
                    position
                        .split(ANNOTATION_SEPARATOR)
                        .filter(|key| !key.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .collect()
        };
        AnnotationTokenStream::new(keys)
    }
}

/// Render posting keys per position into the tokenizer's input format
pub fn encode_positions(keys: &[Vec<String>]) -> String {
    let separator = ANNOTATION_SEPARATOR.to_string();
    keys.iter()
        .map(|position| position.join(&separator))
        .collect::<Vec<_>>()
        .join(&POSITION_SEPARATOR.to_string())
}
