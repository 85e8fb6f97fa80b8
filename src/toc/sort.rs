//! Natural sort keys for human-friendly ordering.
//!
//! "chapter 2" sorts before "chapter 10", and the circled numerals
//! ①–⑩ common in archived Chinese filenames order by their value.

use std::cmp::Ordering;

/// One comparable piece of a name. Numeric segments order before text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    Number(u64),
    Text(String),
}

/// Sort key of a name; compares segment-wise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey(Vec<Segment>);

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Value of a circled-numeral character, if it is one
fn circled_value(c: char) -> Option<u64> {
    // ① (U+2460) through ⑩ (U+2469)
    let base = '①' as u32;
    let v = c as u32;
    if (base..base + 10).contains(&v) {
        Some((v - base + 1) as u64)
    } else {
        None
    }
}

/// Compute the natural sort key of a name.
///
/// Decimal digit runs and circled numerals become numeric segments;
/// everything else compares as lowercase text. Pure function of its
/// input, so repeated computation always yields the same key.
pub fn natural_key(name: &str) -> NaturalKey {
    let mut segments = Vec::new();
    let mut digits = String::new();
    let mut text = String::new();

    let flush_text = |text: &mut String, segments: &mut Vec<Segment>| {
        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(text).to_lowercase()));
        }
    };
    let flush_digits = |digits: &mut String, segments: &mut Vec<Segment>| {
        if !digits.is_empty() {
            // Absurdly long digit runs saturate rather than fail
            let value = digits.parse().unwrap_or(u64::MAX);
            digits.clear();
            segments.push(Segment::Number(value));
        }
    };

    for c in name.chars() {
        if c.is_ascii_digit() {
            flush_text(&mut text, &mut segments);
            digits.push(c);
        } else if let Some(value) = circled_value(c) {
            flush_text(&mut text, &mut segments);
            flush_digits(&mut digits, &mut segments);
            segments.push(Segment::Number(value));
        } else {
            flush_digits(&mut digits, &mut segments);
            text.push(c);
        }
    }
    flush_text(&mut text, &mut segments);
    flush_digits(&mut digits, &mut segments);

    NaturalKey(segments)
}

/// Sort names in place by natural key
pub fn sort_natural<T, F: Fn(&T) -> &str>(items: &mut [T], name: F) {
    items.sort_by_cached_key(|item| natural_key(name(item)));
}
