use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use player_core::{Video, VideoSource};

/// Read a library file: a JSON array of video records
pub fn load_library<P: AsRef<Path>>(path: P) -> Result<Vec<Video>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read library {}", path.display()))?;
    let videos: Vec<Video> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse library {}", path.display()))?;
    if videos.is_empty() {
        bail!("Library {} contains no videos", path.display());
    }
    Ok(videos)
}

/// One video per backend, for running without a library file
pub fn demo_library() -> Vec<Video> {
    vec![
        Video {
            id: "kickoff".to_string(),
            source_video_id: "M7lc1UVf-VE".to_string(),
            title: "Kickoff highlights".to_string(),
            source: VideoSource::Embedded,
            duration_seconds: None,
            resource_url: None,
        },
        Video {
            id: "training".to_string(),
            source_video_id: "training-0412".to_string(),
            title: "Training session".to_string(),
            source: VideoSource::Direct,
            duration_seconds: Some(95.0),
            resource_url: Some("https://media.example.com/training-0412.mp4".to_string()),
        },
        Video {
            id: "final".to_string(),
            source_video_id: "20240302-final".to_string(),
            title: "Cup final, full match".to_string(),
            source: VideoSource::CrossDocument,
            duration_seconds: Some(5400.0),
            resource_url: Some("https://app.veo.co/matches/20240302-final/".to_string()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_demo_library_covers_every_backend() {
        let sources: Vec<VideoSource> = demo_library().iter().map(|v| v.source).collect();
        assert!(sources.contains(&VideoSource::Embedded));
        assert!(sources.contains(&VideoSource::Direct));
        assert!(sources.contains(&VideoSource::CrossDocument));
    }

    #[test]
    fn test_load_library_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{"id":"a","sourceVideoId":"abc","title":"A","source":"embedded"}}]"#
        )
        .unwrap();

        let videos = load_library(&path).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].source, VideoSource::Embedded);
    }

    #[test]
    fn test_empty_library_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.json");
        fs::write(&path, "[]").unwrap();
        assert!(load_library(&path).is_err());
    }

    #[test]
    fn test_missing_library_file_rejected() {
        let dir = tempdir().unwrap();
        assert!(load_library(&dir.path().join("absent.json")).is_err());
    }
}
