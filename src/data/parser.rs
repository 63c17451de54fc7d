//! Parser for the bracketed annotated token stream format.

use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::data::document::{Annotation, TokenStream};
use crate::error::{Result, SearchError};

#[derive(Parser)]
#[grammar = "data/annotation.pest"]
struct AnnotationParser;

fn annotation_error(position: usize, message: impl Into<String>) -> SearchError {
    SearchError::Annotation {
        position,
        message: message.into(),
    }
}

fn number(pair: Pair<Rule>) -> Result<u32> {
    let at = pair.as_span().start();
    pair.as_str()
        .parse()
        .map_err(|_| annotation_error(at, format!("number out of range: {}", pair.as_str())))
}

/// `(start, end)` of a target such as `4` or `4-6`
fn span(pair: Pair<Rule>) -> Result<(u32, u32)> {
    let at = pair.as_span().start();
    let mut parts = pair.into_inner();
    let start = match parts.next() {
        Some(p) => number(p)?,
        None => return Err(annotation_error(at, "empty relation target")),
    };
    let end = match parts.next() {
        Some(p) => number(p)?,
        None => start
            .checked_add(1)
            .ok_or_else(|| annotation_error(at, format!("relation target {} out of range", start)))?,
    };
    Ok((start, end))
}

fn end_after(position: u32, end: u32, at: usize) -> Result<u32> {
    if end <= position {
        return Err(annotation_error(
            at,
            format!("end {} does not follow position {}", end, position),
        ));
    }
    Ok(end)
}

fn annotation(position: u32, pair: Pair<Rule>) -> Result<Annotation> {
    let at = pair.as_span().start();
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();
    let mut next_str = |what: &str| {
        inner
            .next()
            .ok_or_else(|| annotation_error(at, format!("missing {}", what)))
    };
    match rule {
        Rule::element => {
            let name = next_str("element name")?.as_str().to_string();
            let end = number(next_str("element end")?)?;
            Ok(Annotation::Element {
                name,
                end: end_after(position, end, at)?,
            })
        }
        Rule::relation => {
            let label = next_str("relation label")?.as_str().to_string();
            let mut left_end = position + 1;
            let mut part = next_str("relation target")?;
            if part.as_rule() == Rule::left_end {
                let value = part
                    .into_inner()
                    .next()
                    .ok_or_else(|| annotation_error(at, "missing left end"))?;
                left_end = end_after(position, number(value)?, at)?;
                part = next_str("relation target")?;
            }
            let (target_start, target_end) = span(part)?;
            Ok(Annotation::Relation {
                label,
                left_end,
                target_start,
                target_end: end_after(target_start, target_end, at)?,
            })
        }
        Rule::attribute => {
            let key = next_str("attribute key")?.as_str().to_string();
            let value = next_str("attribute value")?.as_str().to_string();
            let end = match inner.next() {
                Some(p) => end_after(position, number(p)?, at)?,
                None => position + 1,
            };
            Ok(Annotation::Attribute { key, value, end })
        }
        Rule::term => {
            let term = next_str("term")?.as_str().to_string();
            let payload = match inner.next() {
                Some(digits) => Some(
                    hex::decode(digits.as_str())
                        .map_err(|e| annotation_error(at, format!("unreadable payload: {}", e)))?,
                ),
                None => None,
            };
            Ok(Annotation::Term { term, payload })
        }
        other => Err(annotation_error(at, format!("unexpected {:?}", other))),
    }
}

pub fn parse_token_stream(text: &str) -> Result<TokenStream> {
    let mut pairs = AnnotationParser::parse(Rule::stream, text).map_err(|e| {
        let position = match e.location {
            InputLocation::Pos(p) => p,
            InputLocation::Span((p, _)) => p,
        };
        annotation_error(position, e.variant.message().to_string())
    })?;

    let mut stream = TokenStream::new();
    let Some(root) = pairs.next() else {
        return Ok(stream);
    };
    for token in root.into_inner().filter(|p| p.as_rule() == Rule::token) {
        let position = stream.push_token(&[]);
        for part in token.into_inner() {
            if part.as_rule() == Rule::offsets {
                let at = part.as_span().start();
                let mut numbers = part.into_inner();
                let (Some(from), Some(to)) = (numbers.next(), numbers.next()) else {
                    return Err(annotation_error(at, "incomplete offsets"));
                };
                stream.set_offsets(position, number(from)?, number(to)?);
                continue;
            }
            match annotation(position, part)? {
                Annotation::Term { term, payload } => match payload {
                    Some(bytes) => stream.add_term_with_payload(position, &term, bytes),
                    None => stream.add_term(position, &term),
                },
                Annotation::Element { name, end } => stream.add_element(&name, position, end),
                Annotation::Relation {
                    label,
                    left_end,
                    target_start,
                    target_end,
                } => stream.add_relation(&label, (position, left_end), (target_start, target_end)),
                Annotation::Attribute { key, value, end } => {
                    stream.add_attribute(&key, &value, position, end)
                }
            }
        }
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_token() {
        let stream =
            parse_token_stream("[(0-3)s:Ich|i:ich|<>:np#1|>:dep$1|@:func=sbj#1] [(4-9)s:kaufe|pos:V]")
                .unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.offsets(), Some(vec![(0, 3), (4, 9)]));
        let first = &stream.positions()[0].annotations;
        assert_eq!(first.len(), 5);
        assert_eq!(
            first[3],
            Annotation::Relation {
                label: "dep".to_string(),
                left_end: 1,
                target_start: 1,
                target_end: 2,
            }
        );
        assert_eq!(
            first[4],
            Annotation::Attribute {
                key: "func".to_string(),
                value: "sbj".to_string(),
                end: 1,
            }
        );
    }

    #[test]
    fn test_relation_with_left_end_and_target_span() {
        let stream = parse_token_stream("[s:a|>:x#2$3-5][s:b][s:c][s:d][s:e]").unwrap();
        assert_eq!(
            stream.positions()[0].annotations[1],
            Annotation::Relation {
                label: "x".to_string(),
                left_end: 2,
                target_start: 3,
                target_end: 5,
            }
        );
    }

    #[test]
    fn test_raw_payload() {
        let stream = parse_token_stream("[s:a^0a0b]").unwrap();
        assert_eq!(
            stream.positions()[0].annotations[0],
            Annotation::Term {
                term: "s:a".to_string(),
                payload: Some(vec![10, 11]),
            }
        );
        assert!(parse_token_stream("[s:a^abc]").is_err());
    }

    #[test]
    fn test_round_trip_through_text() {
        let mut stream = TokenStream::from_text("s:", "der Hund");
        stream.add_element("np", 0, 2);
        stream.add_relation("det", (0, 1), (1, 2));
        let reparsed = parse_token_stream(&stream.to_annotation_string()).unwrap();
        assert_eq!(reparsed, stream);
    }

    #[test]
    fn test_errors_carry_position() {
        match parse_token_stream("[s:a][<>:s#0]") {
            Err(SearchError::Annotation { position, .. }) => assert_eq!(position, 6),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_token_stream("[s:a"),
            Err(SearchError::Annotation { .. })
        ));
        assert!(parse_token_stream("").unwrap().is_empty());
        match parse_token_stream("[s:a|>:dep$4294967295]") {
            Err(SearchError::Annotation { position, .. }) => assert_eq!(position, 11),
            other => panic!("unexpected {:?}", other),
        }
    }
}
