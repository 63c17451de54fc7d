//! Context windows around a match, in tokens or characters.

use serde::{Deserialize, Serialize};

use crate::engine::config::SearchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextUnit {
    Token,
    Char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Side {
    pub unit: ContextUnit,
    pub length: u32,
}

impl Side {
    pub fn tokens(length: u32) -> Self {
        Self {
            unit: ContextUnit::Token,
            length,
        }
    }

    pub fn chars(length: u32) -> Self {
        Self {
            unit: ContextUnit::Char,
            length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSpec {
    pub left: Side,
    pub right: Side,
}

impl ContextSpec {
    pub fn tokens(left: u32, right: u32) -> Self {
        Self {
            left: Side::tokens(left),
            right: Side::tokens(right),
        }
    }

    pub fn chars(left: u32, right: u32) -> Self {
        Self {
            left: Side::chars(left),
            right: Side::chars(right),
        }
    }

    /// Token context of the configured default length on both sides
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::tokens(
            config.default_search_context_length,
            config.default_search_context_length,
        )
    }
}

/// Context bounds of one match. Token bounds are always set; character
/// bounds only for a side requested in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedContext {
    pub start: u32,
    pub end: u32,
    pub char_start: Option<u32>,
    pub char_end: Option<u32>,
}

impl ContextSpec {
    /// Bounds around `[start, end)` in a document of `length` tokens
    pub fn resolve(
        &self,
        config: &SearchConfig,
        start: u32,
        end: u32,
        length: u32,
        offsets: Option<&[(u32, u32)]>,
    ) -> ResolvedContext {
        let length = length.max(end);
        let mut resolved = ResolvedContext {
            start,
            end,
            ..Default::default()
        };

        match (self.left.unit, offsets) {
            (ContextUnit::Token, _) => {
                let width = self.left.length.min(config.max_token_context_size);
                resolved.start = start.saturating_sub(width);
            }
            (ContextUnit::Char, Some(offsets)) if (start as usize) < offsets.len() => {
                let width = self.left.length.min(config.max_char_context_size);
                let char_start = offsets[start as usize].0.saturating_sub(width);
                resolved.char_start = Some(char_start);
                resolved.start = offsets[..start as usize]
                    .iter()
                    .position(|(from, _)| *from >= char_start)
                    .map_or(start, |i| i as u32);
            }
            (ContextUnit::Char, _) => {
                log::debug!("no character offsets for context, keeping token bounds");
            }
        }

        match (self.right.unit, offsets) {
            (ContextUnit::Token, _) => {
                let width = self.right.length.min(config.max_token_context_size);
                resolved.end = end.saturating_add(width).min(length);
            }
            (ContextUnit::Char, Some(offsets)) if end > 0 && (end as usize) <= offsets.len() => {
                let width = self.right.length.min(config.max_char_context_size);
                let last = offsets.last().map_or(0, |(_, to)| *to);
                let char_end = offsets[end as usize - 1].1.saturating_add(width).min(last);
                resolved.char_end = Some(char_end);
                resolved.end = end
                    + offsets[end as usize..]
                        .iter()
                        .take_while(|(_, to)| *to <= char_end)
                        .count() as u32;
            }
            (ContextUnit::Char, _) => {
                log::debug!("no character offsets for context, keeping token bounds");
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_context_is_clamped() {
        let config = SearchConfig::default();
        let context = ContextSpec::tokens(3, 3).resolve(&config, 1, 2, 4, None);
        assert_eq!((context.start, context.end), (0, 4));
        assert_eq!(context.char_start, None);

        let wide = ContextSpec::tokens(100, 100).resolve(&config, 70, 71, 200, None);
        assert_eq!((wide.start, wide.end), (10, 131));
    }

    #[test]
    fn test_char_context() {
        let config = SearchConfig::default();
        // "der alte Hund bellt"
        let offsets = [(0, 3), (4, 8), (9, 13), (14, 19)];
        let context = ContextSpec::chars(5, 3).resolve(&config, 2, 3, 4, Some(&offsets));
        assert_eq!(context.char_start, Some(4));
        assert_eq!(context.char_end, Some(16));
        assert_eq!((context.start, context.end), (1, 3));

        let all = ContextSpec::chars(50, 50).resolve(&config, 1, 2, 4, Some(&offsets));
        assert_eq!(all.char_start, Some(0));
        assert_eq!(all.char_end, Some(19));
        assert_eq!((all.start, all.end), (0, 4));
    }

    #[test]
    fn test_char_context_without_offsets_keeps_match() {
        let config = SearchConfig::default();
        let context = ContextSpec::chars(5, 5).resolve(&config, 2, 3, 4, None);
        assert_eq!((context.start, context.end), (2, 3));
        assert_eq!(context.char_end, None);
    }
}
