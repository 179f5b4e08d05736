//! Timestamped caption parsing (WebVTT / SRT style documents)

use tracing::{debug, warn};

use crate::domain::model::Cue;
use crate::utils::time::TimeParser;

/// Separator between the start and end timestamps of a cue line
const RANGE_SEPARATOR: &str = "-->";

/// Line-oriented cue parser
pub struct CueParser {
    time_parser: TimeParser,
}

impl Default for CueParser {
    fn default() -> Self {
        Self::new()
    }
}

struct PendingCue<'a> {
    start: f64,
    end: f64,
    lines: Vec<&'a str>,
}

impl CueParser {
    pub fn new() -> Self {
        Self {
            time_parser: TimeParser::new(),
        }
    }

    /// Parse a caption document into cues, in document order.
    ///
    /// Lines before the first timestamp line are ignored, as are cue numbers
    /// and anything else that is not attached to a timestamp line. A document
    /// without any timestamp line yields an empty vector.
    pub fn parse(&self, document: &str) -> Vec<Cue> {
        let document = document.strip_prefix('\u{feff}').unwrap_or(document);

        let mut cues = Vec::new();
        let mut pending: Option<PendingCue> = None;
        // Text following an unparseable timestamp line belongs to no cue
        let mut discarding = false;

        for line in document.lines() {
            let trimmed = line.trim();

            if let Some((left, right)) = trimmed.split_once(RANGE_SEPARATOR) {
                Self::flush(pending.take(), &mut cues);
                match self.parse_range(left, right) {
                    Some((start, end)) => {
                        pending = Some(PendingCue {
                            start,
                            end,
                            lines: Vec::new(),
                        });
                        discarding = false;
                    }
                    None => {
                        debug!("Skipping malformed timestamp line: {}", trimmed);
                        discarding = true;
                    }
                }
                continue;
            }

            if trimmed.is_empty() {
                Self::flush(pending.take(), &mut cues);
                discarding = false;
                continue;
            }

            if discarding {
                continue;
            }
            if let Some(cue) = pending.as_mut() {
                cue.lines.push(trimmed);
            }
        }
        Self::flush(pending, &mut cues);

        cues
    }

    fn parse_range(&self, left: &str, right: &str) -> Option<(f64, f64)> {
        let start_token = left.split_whitespace().last()?;
        // Cue settings such as `align:start` may follow the end timestamp
        let end_token = right.split_whitespace().next()?;
        let start = self.time_parser.parse_timestamp(start_token).ok()?;
        let end = self.time_parser.parse_timestamp(end_token).ok()?;
        Some((start, end))
    }

    fn flush(pending: Option<PendingCue>, cues: &mut Vec<Cue>) {
        let Some(cue) = pending else {
            return;
        };

        let text = cue.lines.join(" ").trim().to_string();
        if text.is_empty() {
            return;
        }
        if cue.start > cue.end {
            warn!(
                "Dropping cue with start {:.3} after end {:.3}: {}",
                cue.start, cue.end, text
            );
            return;
        }

        cues.push(Cue {
            start: cue.start,
            end: cue.end,
            text,
        });
    }
}

/// Parse a caption document with the default parser
pub fn parse_cues(document: &str) -> Vec<Cue> {
    CueParser::new().parse(document)
}

/// Join cue texts into one transcript string
pub fn transcript_text(cues: &[Cue]) -> String {
    cues.iter()
        .map(|cue| cue.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cue() {
        let cues = parse_cues("00:00:01.000 --> 00:00:03.500\nHello world");
        assert_eq!(
            cues,
            vec![Cue {
                start: 1.0,
                end: 3.5,
                text: "Hello world".to_string()
            }]
        );
    }

    #[test]
    fn test_vtt_header_and_multiline_text() {
        let doc = "WEBVTT\nKind: captions\n\n\
                   00:01.000 --> 00:04.000 align:start\nfirst line\nsecond line\n\n\
                   00:05.000 --> 00:06.000\nnext\n";
        let cues = parse_cues(doc);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "first line second line");
        assert_eq!(cues[0].start, 1.0);
        assert_eq!(cues[1].end, 6.0);
    }

    #[test]
    fn test_srt_numbers_and_comma_fractions() {
        let doc = "1\n00:00:00,500 --> 00:00:02,250\nHi\n\n2\n00:00:03,000 --> 00:00:04,000\nThere\n";
        let cues = parse_cues(doc);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start, 0.5);
        assert_eq!(cues[0].end, 2.25);
        assert_eq!(cues[1].text, "There");
    }

    #[test]
    fn test_back_to_back_timestamp_lines() {
        let doc = "00:01 --> 00:02\n00:02 --> 00:03\ntext";
        let cues = parse_cues(doc);
        // First cue has no text and is dropped
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 2.0);
    }

    #[test]
    fn test_empty_text_dropped_silently() {
        let doc = "00:00:01.000 --> 00:00:02.000\n   \n00:00:03.000 --> 00:00:04.000\nkept";
        let cues = parse_cues(doc);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "kept");
    }

    #[test]
    fn test_no_timestamps_yields_empty() {
        assert!(parse_cues("just some text\nwithout timing").is_empty());
        assert!(parse_cues("").is_empty());
    }

    #[test]
    fn test_input_order_preserved() {
        let doc = "00:10 --> 00:11\nlater\n\n00:01 --> 00:02\nearlier\n";
        let cues = parse_cues(doc);
        assert_eq!(cues[0].text, "later");
        assert_eq!(cues[1].text, "earlier");
    }

    #[test]
    fn test_malformed_timestamp_line_skips_its_text() {
        let doc = "00:xx --> 00:02\norphan\n\n00:03 --> 00:04\nok\n";
        let cues = parse_cues(doc);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "ok");
    }

    #[test]
    fn test_start_after_end_dropped() {
        let cues = parse_cues("00:05 --> 00:01\nbackwards\n");
        assert!(cues.is_empty());
    }

    #[test]
    fn test_transcript_text() {
        let cues = parse_cues("00:01 --> 00:02\na\n\n00:02 --> 00:03\nb\n");
        assert_eq!(transcript_text(&cues), "a b");
    }
}
