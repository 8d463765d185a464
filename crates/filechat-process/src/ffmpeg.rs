//! FFmpeg integration for pulling the audio track out of video files.

use crate::error::{ProcessError, ProcessResult};
use crate::require_tool;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Extract audio from a video file.
///
/// Returns the path to the extracted audio file: 16kHz mono WAV, which is
/// what Whisper expects.
pub fn extract_audio(video_path: &Path, output_dir: &Path) -> ProcessResult<PathBuf> {
    if !video_path.exists() {
        return Err(ProcessError::FileNotFound(video_path.to_path_buf()));
    }
    require_tool("ffmpeg")?;

    let stem = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    let audio_path = output_dir.join(format!("{}.wav", stem));

    info!("Extracting audio from {:?} to {:?}", video_path, audio_path);

    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(video_path)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1", "-y"])
        .arg(&audio_path)
        .output()?;

    if !output.status.success() {
        return Err(ProcessError::FfmpegError(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    debug!("Audio extracted successfully");
    Ok(audio_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_video_is_reported() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("lecture.mp4");

        match extract_audio(&missing, dir.path()) {
            Err(ProcessError::FileNotFound(path)) => assert_eq!(path, missing),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
