//! Online video subtitles and audio via yt-dlp.

use crate::error::{ProcessError, ProcessResult};
use crate::require_tool;
use crate::transcribe::TranscriptSegment;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Subtitles of an online video.
#[derive(Debug, Clone)]
pub struct VideoTranscript {
    pub title: Option<String>,
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
}

/// Fetch the subtitles (uploaded or automatic) of a video, in `language`.
///
/// Fails with [`ProcessError::NoSubtitles`] when the video has none, so the
/// caller can fall back to [`download_audio`] and transcription.
pub fn fetch_subtitles(
    url: &str,
    language: &str,
    output_dir: &Path,
) -> ProcessResult<VideoTranscript> {
    require_tool("yt-dlp")?;

    info!("Fetching subtitles for {}", url);

    let output = Command::new("yt-dlp")
        .args(["--skip-download", "--write-info-json"])
        .args(["--write-subs", "--write-auto-subs"])
        .args(["--sub-langs", &format!("{}.*", language)])
        .args(["--sub-format", "vtt"])
        .arg("-o")
        .arg(output_dir.join("video.%(ext)s"))
        .arg(url)
        .output()?;

    if !output.status.success() {
        return Err(ProcessError::DownloadError(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let title = read_title(&output_dir.join("video.info.json"));

    let vtt_path = find_with_extension(output_dir, "vtt")?
        .ok_or_else(|| ProcessError::NoSubtitles(url.to_string()))?;
    let segments = parse_vtt(&std::fs::read_to_string(&vtt_path)?);
    if segments.is_empty() {
        return Err(ProcessError::NoSubtitles(url.to_string()));
    }

    debug!("Parsed {} subtitle segments from {:?}", segments.len(), vtt_path);
    Ok(VideoTranscript { title, segments })
}

/// Download the audio track of a video as WAV. Needs ffmpeg as well.
pub fn download_audio(url: &str, output_dir: &Path) -> ProcessResult<PathBuf> {
    require_tool("yt-dlp")?;
    require_tool("ffmpeg")?;

    info!("Downloading audio for {}", url);

    let output = Command::new("yt-dlp")
        .args(["--extract-audio", "--audio-format", "wav", "--no-playlist"])
        .arg("-o")
        .arg(output_dir.join("audio.%(ext)s"))
        .arg(url)
        .output()?;

    if !output.status.success() {
        return Err(ProcessError::DownloadError(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let audio_path = output_dir.join("audio.wav");
    if !audio_path.exists() {
        return Err(ProcessError::DownloadError(
            "yt-dlp produced no audio file".to_string(),
        ));
    }
    Ok(audio_path)
}

fn read_title(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<InfoJson>(&contents) {
        Ok(info) => info.title,
        Err(e) => {
            warn!("Unreadable video info {:?}: {}", path, e);
            None
        }
    }
}

fn find_with_extension(dir: &Path, extension: &str) -> ProcessResult<Option<PathBuf>> {
    let mut matches = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}

/// Parse a WebVTT document into transcript segments.
///
/// Inline markup (`<c>`, word timestamps) is stripped, and lines repeated
/// from the previous cue, as in rolling automatic captions, are dropped.
pub fn parse_vtt(vtt: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut last_line = String::new();
    let mut lines = vtt.lines().peekable();

    while let Some(line) = lines.next() {
        let Some((start, end)) = parse_cue_timing(line) else {
            continue;
        };

        let mut fresh = Vec::new();
        while let Some(text) = lines.next_if(|l| !l.trim().is_empty()) {
            let cleaned = clean_cue_text(text);
            if cleaned.is_empty() || cleaned == last_line {
                continue;
            }
            last_line = cleaned.clone();
            fresh.push(cleaned);
        }

        if !fresh.is_empty() {
            segments.push(TranscriptSegment {
                text: fresh.join(" "),
                start,
                end,
            });
        }
    }

    segments
}

fn parse_cue_timing(line: &str) -> Option<(f64, f64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    Some((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// `hh:mm:ss.mmm` or `mm:ss.mmm`.
fn parse_timestamp(value: &str) -> Option<f64> {
    let mut seconds = 0.0;
    for part in value.split(':') {
        let part: f64 = part.parse().ok()?;
        seconds = seconds * 60.0 + part;
    }
    Some(seconds)
}

fn clean_cue_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_simple_vtt() {
        let vtt = "WEBVTT\n\
                   Kind: captions\n\
                   Language: en\n\
                   \n\
                   1\n\
                   00:00:01.000 --> 00:00:04.000\n\
                   Cells are the basic unit\n\
                   of life.\n\
                   \n\
                   NOTE this is ignored\n\
                   \n\
                   00:04.000 --> 00:06.500 align:start position:0%\n\
                   Mitochondria &amp; energy\n";

        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Cells are the basic unit of life.");
        assert_eq!(segments[0].start, 1.0);
        assert_eq!(segments[0].end, 4.0);
        assert_eq!(segments[1].text, "Mitochondria & energy");
        assert_eq!(segments[1].start, 4.0);
    }

    #[test]
    fn test_parse_rolling_auto_captions() {
        let vtt = "WEBVTT\n\n\
                   00:00:00.000 --> 00:00:02.000\n\
                   <c>hello</c><00:00:00.500><c> everyone</c>\n\
                   \n\
                   00:00:02.000 --> 00:00:04.000\n\
                   hello everyone\n\
                   today we talk about cells\n";

        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello everyone");
        assert_eq!(segments[1].text, "today we talk about cells");
    }

    #[test]
    fn test_parse_vtt_without_cues() {
        assert!(parse_vtt("WEBVTT\n\n").is_empty());
        assert!(parse_vtt("").is_empty());
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(parse_timestamp("01:02:03.500"), Some(3723.5));
        assert_eq!(parse_timestamp("02:03.000"), Some(123.0));
        assert_eq!(parse_timestamp("abc"), None);
    }

    #[test]
    fn test_read_title_and_find_vtt() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("video.info.json"),
            r#"{"id": "abc", "title": "Intro to Biology"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("video.en.vtt"), "WEBVTT\n").unwrap();

        assert_eq!(
            read_title(&dir.path().join("video.info.json")).as_deref(),
            Some("Intro to Biology")
        );
        assert_eq!(
            find_with_extension(dir.path(), "vtt").unwrap(),
            Some(dir.path().join("video.en.vtt"))
        );
        assert_eq!(find_with_extension(dir.path(), "wav").unwrap(), None);
    }
}
