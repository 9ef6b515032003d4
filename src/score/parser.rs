//! Score announcement parsing.
//!
//! Announcement lines look like
//! `**Raiders    120    Great Run [5.1234->6.0567]**`: an optional pair of
//! identical bold/underline markers, the entity name, four spaces, the points,
//! four spaces, the map name, then the old and new score in brackets.
//! Contest announcements carry the markers, regular ones do not.

use crate::common::error::{ScoreParseError, ScoreParseReason};

/// Field separator between name, points and map.
const SEPARATOR: &str = "    ";

/// Markup pairs that may wrap a contest announcement.
const MARKERS: [&str; 2] = ["**", "__"];

/// Some feeds put a zero-width joiner after the arrow.
const ZERO_WIDTH_JOINER: char = '\u{200D}';

/// Fixed-point scale of encoded scores (four fractional digits).
pub const SCORE_SCALE: i64 = 10_000;

/// A parsed score announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub name: String,
    pub points: i64,
    pub is_contest: bool,
    pub map_name: String,
    /// Score before the run, in ten-thousandths.
    pub score_old: i64,
    /// Score after the run, in ten-thousandths.
    pub score_new: i64,
}

/// Parse a chat line into a score record.
pub fn parse_score_line(line: &str) -> Result<ScoreRecord, ScoreParseError> {
    parse_inner(line).map_err(|reason| ScoreParseError {
        line: line.to_string(),
        reason,
    })
}

fn parse_inner(line: &str) -> Result<ScoreRecord, ScoreParseReason> {
    let (body, is_contest) = strip_markup(line)?;
    let (name, points, rest) = split_name_points(body)?;

    let scores = rest.strip_suffix(']').ok_or(ScoreParseReason::MissingScores)?;
    let (map_name, scores) = scores.rsplit_once(" [").ok_or(ScoreParseReason::MissingScores)?;
    if map_name.is_empty() {
        return Err(ScoreParseReason::MissingMap);
    }

    let (old, new) = scores.split_once("->").ok_or(ScoreParseReason::MissingScores)?;
    let new = new.strip_prefix(ZERO_WIDTH_JOINER).unwrap_or(new);

    Ok(ScoreRecord {
        name: name.to_string(),
        points,
        is_contest,
        map_name: map_name.to_string(),
        score_old: parse_score(old).ok_or(ScoreParseReason::InvalidScore)?,
        score_new: parse_score(new).ok_or(ScoreParseReason::InvalidScore)?,
    })
}

/// Split `NAME    POINTS    REST`.
///
/// Names may themselves contain four-space runs, so the name ends at the
/// first separator followed by an all-digit points field and another
/// separator. When no separator qualifies, the error describes the first one.
fn split_name_points(body: &str) -> Result<(&str, i64, &str), ScoreParseReason> {
    let candidate = (1..body.len())
        .filter(|&at| body.is_char_boundary(at) && body[at..].starts_with(SEPARATOR))
        .find_map(|at| {
            let (points, rest) = body[at + SEPARATOR.len()..].split_once(SEPARATOR)?;
            let points = parse_digits(points)?;
            Some((&body[..at], points, rest))
        });
    if let Some(found) = candidate {
        return Ok(found);
    }

    let (name, rest) = body.split_once(SEPARATOR).ok_or(ScoreParseReason::MissingName)?;
    if name.is_empty() {
        return Err(ScoreParseReason::MissingName);
    }
    match rest.split_once(SEPARATOR) {
        Some(_) => Err(ScoreParseReason::InvalidPoints),
        None => Err(ScoreParseReason::MissingPoints),
    }
}

/// Strip a leading/trailing marker pair. Both must be present and equal, or both absent.
fn strip_markup(line: &str) -> Result<(&str, bool), ScoreParseReason> {
    let leading = MARKERS.iter().find(|m| line.starts_with(*m));
    let trailing = MARKERS.iter().find(|m| line.ends_with(*m));

    match (leading, trailing) {
        (None, None) => Ok((line, false)),
        (Some(open), Some(close)) if open == close && line.len() >= open.len() * 2 => {
            Ok((&line[open.len()..line.len() - close.len()], true))
        }
        _ => Err(ScoreParseReason::MismatchedMarkup),
    }
}

/// Parse an unsigned run of ASCII digits.
fn parse_digits(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse `<whole>.<3 or 4 digits>` into ten-thousandths.
fn parse_score(text: &str) -> Option<i64> {
    let (whole, fraction) = text.split_once('.')?;
    let whole = parse_digits(whole)?;
    let scale = match fraction.len() {
        4 => 1,
        3 => 10,
        _ => return None,
    };
    let fraction = parse_digits(fraction)? * scale;
    whole.checked_mul(SCORE_SCALE)?.checked_add(fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contest_line() {
        let record = parse_score_line("**Raiders    120    Great Run [5.1234->6.0567]**").unwrap();
        assert_eq!(
            record,
            ScoreRecord {
                name: "Raiders".to_string(),
                points: 120,
                is_contest: true,
                map_name: "Great Run".to_string(),
                score_old: 51234,
                score_new: 60567,
            }
        );
    }

    #[test]
    fn test_regular_line() {
        let record = parse_score_line("Raiders    7    Great Run [0.0001->12.5000]").unwrap();
        assert!(!record.is_contest);
        assert_eq!(record.points, 7);
        assert_eq!(record.score_old, 1);
        assert_eq!(record.score_new, 125_000);
    }

    #[test]
    fn test_zero_width_joiner_after_arrow() {
        let record = parse_score_line("Raiders    7    Great Run [1.0000->\u{200D}2.0000]").unwrap();
        assert_eq!(record.score_old, 10_000);
        assert_eq!(record.score_new, 20_000);
    }

    #[test]
    fn test_three_digit_fraction_is_scaled() {
        let record = parse_score_line("Raiders    1    Map [3.123->3.1234]").unwrap();
        assert_eq!(record.score_old, 31_230);
        assert_eq!(record.score_new, 31_234);
    }

    #[test]
    fn test_missing_trailing_markup_rejected() {
        let err = parse_score_line("**Raiders    120    Great Run [5.1234->6.0567]").unwrap_err();
        assert_eq!(err.reason, ScoreParseReason::MismatchedMarkup);
        assert_eq!(err.line, "**Raiders    120    Great Run [5.1234->6.0567]");
    }

    #[test]
    fn test_mixed_markers_rejected() {
        let err = parse_score_line("**Raiders    120    Great Run [5.1234->6.0567]__").unwrap_err();
        assert_eq!(err.reason, ScoreParseReason::MismatchedMarkup);
    }

    #[test]
    fn test_name_with_separator_run() {
        let record = parse_score_line("Red    Team    12    Map [1.000->2.000]").unwrap();
        assert_eq!(record.name, "Red    Team");
        assert_eq!(record.points, 12);
        assert_eq!(record.map_name, "Map");
    }

    #[test]
    fn test_extra_space_stays_in_name() {
        let record = parse_score_line("Raiders     12    Map [1.000->2.000]").unwrap();
        assert_eq!(record.name, "Raiders ");
        assert_eq!(record.points, 12);
    }

    #[test]
    fn test_map_name_with_brackets() {
        let record = parse_score_line("Raiders    5    Run [Hard] [1.000->2.000]").unwrap();
        assert_eq!(record.map_name, "Run [Hard]");
    }

    #[test]
    fn test_malformed_lines_rejected() {
        let cases = [
            ("", ScoreParseReason::MissingName),
            ("hello world", ScoreParseReason::MissingName),
            ("    120    Map [1.0000->2.0000]", ScoreParseReason::MissingName),
            ("Raiders    120 Map [1.0000->2.0000]", ScoreParseReason::MissingPoints),
            ("Raiders    12a    Map [1.0000->2.0000]", ScoreParseReason::InvalidPoints),
            ("Raiders    -1    Map [1.0000->2.0000]", ScoreParseReason::InvalidPoints),
            ("Raiders    120    Map", ScoreParseReason::MissingScores),
            ("Raiders    120     [1.0000->2.0000]", ScoreParseReason::MissingMap),
            ("Raiders    120    Map [1.0000-2.0000]", ScoreParseReason::MissingScores),
            ("Raiders    120    Map [1.00->2.0000]", ScoreParseReason::InvalidScore),
            ("Raiders    120    Map [1.00000->2.0000]", ScoreParseReason::InvalidScore),
            ("Raiders    120    Map [1->2.0000]", ScoreParseReason::InvalidScore),
            ("Raiders    120    Map [1.0000->2.0000] ", ScoreParseReason::MissingScores),
        ];

        for (line, reason) in cases {
            let err = parse_score_line(line).unwrap_err();
            assert_eq!(err.reason, reason, "line: {:?}", line);
        }
    }

    #[test]
    fn test_lone_markers_rejected() {
        assert_eq!(
            parse_score_line("**").unwrap_err().reason,
            ScoreParseReason::MismatchedMarkup
        );
        // "***" both starts and ends with "**" but the pair would overlap
        assert_eq!(
            parse_score_line("***").unwrap_err().reason,
            ScoreParseReason::MismatchedMarkup
        );
    }
}
