//! Filechat Process - Media processing for audio, video and online videos.
//!
//! This crate provides:
//! - Audio extraction from video (via FFmpeg CLI)
//! - Audio transcription (via Whisper CLI)
//! - Subtitle and audio download for online videos (via yt-dlp CLI)
//!
//! These rely on external tools being installed on the system.

mod error;
mod ffmpeg;
mod transcribe;
mod ytdlp;

pub use error::{ProcessError, ProcessResult};
pub use ffmpeg::extract_audio;
pub use transcribe::{segments_to_text, transcribe_audio, TranscriptSegment};
pub use ytdlp::{download_audio, fetch_subtitles, parse_vtt, VideoTranscript};

/// Check if required external tools are available.
pub fn check_dependencies() -> Vec<(&'static str, bool)> {
    vec![
        ("ffmpeg", which::which("ffmpeg").is_ok()),
        ("whisper", which::which("whisper").is_ok()),
        ("yt-dlp", which::which("yt-dlp").is_ok()),
    ]
}

pub(crate) fn require_tool(tool: &str) -> ProcessResult<()> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| ProcessError::ToolNotFound {
            tool: tool.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dependencies_lists_every_tool() {
        let tools: Vec<&str> = check_dependencies().into_iter().map(|(tool, _)| tool).collect();
        assert_eq!(tools, vec!["ffmpeg", "whisper", "yt-dlp"]);
    }

    #[test]
    fn test_require_missing_tool() {
        let err = require_tool("filechat-no-such-tool").unwrap_err();
        assert!(matches!(err, ProcessError::ToolNotFound { ref tool } if tool == "filechat-no-such-tool"));
    }
}
