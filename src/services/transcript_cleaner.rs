use std::sync::LazyLock;

use regex::Regex;

static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2}[.,]\d{3}\s+-->").expect("cue timing pattern is valid")
});

fn is_metadata_line(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower == "webvtt" || lower.starts_with("kind:") || lower.starts_with("language:")
}

fn is_cue_counter(line: &str) -> bool {
    line.bytes().all(|b| b.is_ascii_digit())
}

/// Reduces a WebVTT/SRT subtitle file to its spoken text, one cue line per line.
///
/// Drops the header, `Kind:`/`Language:` metadata, cue timings, numeric cue
/// counters and blank lines.
pub fn clean_transcript(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_metadata_line(line))
        .filter(|line| !CUE_TIMING.is_match(line))
        .filter(|line| !is_cue_counter(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_vtt_scaffolding() {
        let raw = "WEBVTT\nKind: captions\nLanguage: zh-TW\n\n\
                   00:00:01.000 --> 00:00:03.500\nTSMC hit a new high\n\n\
                   00:00:03.500 --> 00:00:06.000 align:start\nrates stay on hold\n";

        assert_eq!(clean_transcript(raw), "TSMC hit a new high\nrates stay on hold");
    }

    #[test]
    fn test_strips_srt_counters_and_comma_timings() {
        let raw = "1\r\n00:00:01,000 --> 00:00:02,000\r\nfirst line\r\n\r\n2\r\n00:00:02,000 --> 00:00:04,000\r\nsecond line\r\n";
        assert_eq!(clean_transcript(raw), "first line\nsecond line");
    }

    #[test]
    fn test_keeps_text_with_numbers() {
        let raw = "2330 closed at 600\n2330";
        assert_eq!(clean_transcript(raw), "2330 closed at 600");
    }

    #[test]
    fn test_metadata_match_ignores_case() {
        assert_eq!(clean_transcript("webvtt\nKIND: captions\nhello"), "hello");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_transcript(""), "");
        assert_eq!(clean_transcript("WEBVTT\n\n"), "");
    }
}
