//! Line reconstruction
//!
//! Groups OCR tokens into display lines. Engine layout numbers are used when
//! present; otherwise tokens are clustered by vertical center.

use std::collections::BTreeMap;

use super::{TextLine, TextToken};

/// Fraction of the tallest token height within which centers share a line
const LINE_CENTER_TOLERANCE: f32 = 0.7;

/// Group tokens into lines.
///
/// Every token ends up in exactly one line, so no text is lost here; any
/// filtering happens before this step.
pub fn reconstruct_lines(tokens: &[TextToken]) -> Vec<TextLine> {
    if tokens.is_empty() {
        return Vec::new();
    }

    if tokens.iter().any(|t| t.line.is_some()) {
        group_by_layout(tokens)
    } else {
        group_by_geometry(tokens)
    }
}

/// Group by (paragraph, block, line) as reported by the engine
fn group_by_layout(tokens: &[TextToken]) -> Vec<TextLine> {
    let mut groups: BTreeMap<(u32, u32, u32), Vec<&TextToken>> = BTreeMap::new();
    for token in tokens {
        let key = (
            token.paragraph.unwrap_or(0),
            token.block.unwrap_or(0),
            token.line.unwrap_or(0),
        );
        groups.entry(key).or_default().push(token);
    }

    groups.into_values().map(merge_line).collect()
}

/// Single-pass greedy clustering on vertical centers
fn group_by_geometry(tokens: &[TextToken]) -> Vec<TextLine> {
    let mut sorted: Vec<&TextToken> = tokens.iter().collect();
    sorted.sort_by_key(|t| (t.bounds.y, t.bounds.x));

    let max_height = sorted.iter().map(|t| t.bounds.height).max().unwrap_or(0).max(1);
    let threshold = max_height as f32 * LINE_CENTER_TOLERANCE;

    let mut lines: Vec<Vec<&TextToken>> = Vec::new();
    let mut current: Vec<&TextToken> = Vec::new();
    let mut current_center = 0.0f32;

    for token in sorted {
        let center = token.bounds.center_y();
        if !current.is_empty() && (center - current_center).abs() <= threshold {
            current.push(token);
            let n = current.len() as f32;
            current_center = (current_center * (n - 1.0) + center) / n;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push(token);
            current_center = center;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.into_iter().map(merge_line).collect()
}

fn merge_line(mut members: Vec<&TextToken>) -> TextLine {
    members.sort_by_key(|t| t.bounds.x);

    let text = members
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let bounds = members
        .iter()
        .skip(1)
        .fold(members[0].bounds, |acc, t| acc.union(&t.bounds));
    let confidence =
        members.iter().map(|t| t.confidence).sum::<f32>() / members.len() as f32;

    TextLine {
        text,
        bounds,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::BoundingBox;

    fn word(text: &str, x: i32, y: i32, w: i32, h: i32) -> TextToken {
        TextToken::new(text, BoundingBox::new(x, y, w, h), 80.0)
    }

    #[test]
    fn test_empty_input() {
        assert!(reconstruct_lines(&[]).is_empty());
    }

    #[test]
    fn test_layout_grouping_orders_left_to_right() {
        let tokens = vec![
            word("world", 60, 10, 40, 20).with_layout(1, 1, 1),
            word("Hello", 10, 12, 45, 18).with_layout(1, 1, 1),
            word("Second", 10, 40, 60, 20).with_layout(1, 1, 2),
        ];

        let lines = reconstruct_lines(&tokens);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Hello world");
        assert_eq!(lines[0].bounds, BoundingBox::new(10, 10, 90, 20));
        assert_eq!(lines[1].text, "Second");
    }

    #[test]
    fn test_layout_confidence_is_mean() {
        let mut a = word("a", 0, 0, 10, 10).with_layout(1, 1, 1);
        let mut b = word("b", 20, 0, 10, 10).with_layout(1, 1, 1);
        a.confidence = 60.0;
        b.confidence = 90.0;

        let lines = reconstruct_lines(&[a, b]);
        assert!((lines[0].confidence - 75.0).abs() < 0.001);
    }

    #[test]
    fn test_geometric_grouping() {
        // Two visual lines, tokens deliberately out of order
        let tokens = vec![
            word("line", 80, 52, 30, 20),
            word("First", 0, 10, 40, 20),
            word("Second", 0, 50, 70, 22),
            word("row", 50, 13, 30, 18),
        ];

        let lines = reconstruct_lines(&tokens);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "First row");
        assert_eq!(lines[1].text, "Second line");
    }

    #[test]
    fn test_geometric_threshold_splits_lines() {
        // Max height 10 -> threshold 7; centers 5 and 13 are 8 apart
        let tokens = vec![word("top", 0, 0, 10, 10), word("low", 0, 8, 10, 10)];
        assert_eq!(reconstruct_lines(&tokens).len(), 2);

        // Centers 5 and 11 are 6 apart
        let tokens = vec![word("top", 0, 0, 10, 10), word("same", 20, 6, 10, 10)];
        assert_eq!(reconstruct_lines(&tokens).len(), 1);
    }

    #[test]
    fn test_lines_cover_union_and_keep_all_text() {
        let tokens = vec![
            word("uno", 5, 5, 20, 10),
            word("dos", 30, 6, 20, 10),
            word("tres", 5, 40, 25, 12),
            word("cuatro", 40, 42, 30, 11),
            word("cinco", 10, 80, 30, 10),
        ];

        let lines = reconstruct_lines(&tokens);

        let union = tokens
            .iter()
            .skip(1)
            .fold(tokens[0].bounds, |acc, t| acc.union(&t.bounds));
        let lines_union = lines
            .iter()
            .skip(1)
            .fold(lines[0].bounds, |acc, l| acc.union(&l.bounds));
        assert_eq!(union, lines_union);

        let mut words: Vec<String> = lines
            .iter()
            .flat_map(|l| l.text.split(' ').map(str::to_string).collect::<Vec<_>>())
            .collect();
        words.sort();
        let mut expected: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();
        expected.sort();
        assert_eq!(words, expected);
    }
}
