//! SubRip (`.srt`) reading and writing.

use anyhow::{Context, Result};
use std::path::Path;

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Parse a `HH:MM:SS,mmm` timestamp into seconds. `.` is accepted as the
/// millisecond separator.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let s = s.trim();
    let (hms, frac) = match s.find([',', '.']) {
        Some(pos) => (&s[..pos], &s[pos + 1..]),
        None => (s, ""),
    };

    let mut parts = hms.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.trim().parse().ok()?;
    let seconds: u64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    let fraction = if frac.is_empty() {
        0.0
    } else {
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits: u32 = frac.len().try_into().ok()?;
        frac.parse::<u64>().ok()? as f64 / 10f64.powi(digits as i32)
    };

    let whole = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)?;
    Some(whole as f64 + fraction)
}

/// Format seconds as an SRT timestamp.
pub fn format_timestamp(secs: f64) -> String {
    let total_ms = if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_ms / 3_600_000,
        (total_ms / 60_000) % 60,
        (total_ms / 1000) % 60,
        total_ms % 1000
    )
}

/// Parse SRT text. Malformed cues are skipped with a warning.
pub fn parse(input: &str) -> Vec<Cue> {
    let input = input.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in input.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !block.is_empty() {
                match parse_block(&block, cues.len() + 1) {
                    Some(cue) => cues.push(cue),
                    None => tracing::warn!(first_line = block[0], "Skipping malformed subtitle cue"),
                }
                block.clear();
            }
        } else {
            block.push(line);
        }
    }

    cues
}

fn parse_block(lines: &[&str], fallback_index: usize) -> Option<Cue> {
    let (index, timing_pos) = match lines.first()?.trim().parse::<usize>() {
        Ok(index) => (index, 1),
        Err(_) => (fallback_index, 0),
    };

    let timing = lines.get(timing_pos)?;
    let (start, end) = timing.split_once("-->")?;
    let start = parse_timestamp(start)?;
    // Anything after the end timestamp is positioning, which is ignored
    let end = parse_timestamp(end.split_whitespace().next()?)?;
    if end <= start {
        return None;
    }

    let text = lines[timing_pos + 1..].join("\n");

    Some(Cue {
        index,
        start,
        end,
        text,
    })
}

/// Read and parse an SRT file.
pub fn parse_file(path: &Path) -> Result<Vec<Cue>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read subtitle file: {:?}", path))?;
    let cues = parse(&String::from_utf8_lossy(&bytes));
    tracing::debug!(path = %path.display(), cues = cues.len(), "Parsed subtitles");
    Ok(cues)
}

/// Render cues back to SRT text.
pub fn compose(cues: &[Cue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            cue.text
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:10,000 --> 00:00:12,500\nWhat the hell\nis going on?\n\n2\n00:01:05,250 --> 00:01:07,000\nNothing.\n";

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:10,000"), Some(10.0));
        assert_eq!(parse_timestamp("01:02:03.500"), Some(3723.5));
        assert_eq!(parse_timestamp(" 00:00:01,5 "), Some(1.5));
        assert_eq!(parse_timestamp("00:61:00,000"), None);
        assert_eq!(parse_timestamp("garbage"), None);
    }

    #[test]
    fn test_oversized_timestamp_is_skipped() {
        assert_eq!(parse_timestamp("9999999999999999:00:00,000"), None);

        let input = format!(
            "1\n9999999999999999:00:00,000 --> 9999999999999999:00:01,000\nhell\n\n{}",
            SAMPLE.replacen("1\n", "2\n", 1)
        );
        let cues = parse(&input);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start, 10.0);
    }

    #[test]
    fn test_parse_cues() {
        let cues = parse(SAMPLE);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, 10.0);
        assert_eq!(cues[0].end, 12.5);
        assert_eq!(cues[0].text, "What the hell\nis going on?");
        assert_eq!(cues[1].start, 65.25);
    }

    #[test]
    fn test_parse_tolerates_bom_and_crlf() {
        let input = format!("\u{feff}{}", SAMPLE.replace('\n', "\r\n"));
        assert_eq!(parse(&input), parse(SAMPLE));
    }

    #[test]
    fn test_parse_skips_malformed_cues() {
        let input = "1\nnot a timing line\nText\n\n2\n00:00:05,000 --> 00:00:04,000\nBackwards\n\n3\n00:00:06,000 --> 00:00:07,000\nKept\n";
        let cues = parse(input);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 3);
    }

    #[test]
    fn test_parse_cue_without_index() {
        let cues = parse("00:00:01,000 --> 00:00:02,000 X1:10 X2:20\nHello\n");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].end, 2.0);
    }

    #[test]
    fn test_compose_round_trips() {
        let cues = parse(SAMPLE);
        assert_eq!(parse(&compose(&cues)), cues);
        assert!(compose(&cues).starts_with("1\n00:00:10,000 --> 00:00:12,500\n"));
    }
}
