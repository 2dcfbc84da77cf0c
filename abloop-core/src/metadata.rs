use std::{fmt::Display, path::Path};

use lofty::{file::TaggedFileExt, probe::Probe, tag::Accessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    #[default]
    Unsupported,
}

impl ChannelLayout {
    pub fn from_channels(num_channels: u16) -> ChannelLayout {
        match num_channels {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            _ => ChannelLayout::Unsupported,
        }
    }
}

/// Descriptive information about a loaded track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    /// Audio format (mp3, flac, wav, ogg, etc)
    pub format: String,
    /// sample rate / sampling frequency (f_s)
    pub sample_rate: u32,
    /// number of audio channels
    pub num_channels: u16,
    pub channel_layout: ChannelLayout,
    /// Where the track was loaded from
    pub location: String,
    pub title: Option<String>,
    /// Track artist (if many, separated by semicolon)
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    /// Duration in seconds
    pub duration: f64,
}

impl TrackMetadata {
    /// Title for display, falling back to the location's file stem.
    pub fn display_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            Path::new(&self.location)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown Title")
                .to_string()
        })
    }

    /// Fill title/artist/album/genre from the file's primary tag.
    ///
    /// Missing or unreadable tags are not an error: the track still plays.
    pub fn read_tags(&mut self, path: &Path) {
        match Probe::open(path).and_then(|p| p.read()) {
            Ok(tagged_file) => {
                if let Some(tag) = tagged_file.primary_tag() {
                    self.title = tag.title().map(|s| s.to_string());
                    self.artist = tag.artist().map(|s| s.to_string());
                    self.album = tag.album().map(|s| s.to_string());
                    self.genre = tag.genre().map(|s| s.to_string());

                    log::info!("Metadata loaded: {:?} by {:?}", self.title, self.artist);
                }
            }
            Err(e) => {
                log::warn!("Failed to read metadata: {}", e);
            }
        }

        if self.title.is_none() {
            self.title = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string());
        }
    }
}

impl Display for TrackMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mins = (self.duration / 60.0).floor() as u64;
        let secs = (self.duration % 60.0).floor() as u64;
        let artist = self.artist.as_deref().unwrap_or("Unknown Artist");
        let album = self.album.as_deref().unwrap_or("Unknown Album");

        writeln!(f, "Track:  {} - {}", self.display_title(), artist)?;
        writeln!(f, "Album:  {}", album)?;
        writeln!(f, "Length: {:02}:{:02}", mins, secs)?;
        writeln!(
            f,
            "Format: {} ({:.1} kHz, {})",
            self.format.to_uppercase(),
            self.sample_rate as f64 / 1000.0,
            self.channel_layout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_title_falls_back_to_file_stem() {
        let meta = TrackMetadata {
            location: "/music/intro-riff.flac".to_string(),
            ..Default::default()
        };
        assert_eq!(meta.display_title(), "intro-riff");
    }

    #[test]
    fn display_formats_length_as_minutes_and_seconds() {
        let meta = TrackMetadata {
            title: Some("Solo".to_string()),
            format: "wav".to_string(),
            sample_rate: 44_100,
            channel_layout: ChannelLayout::Stereo,
            duration: 125.4,
            ..Default::default()
        };
        let text = meta.to_string();
        assert!(text.contains("Length: 02:05"));
        assert!(text.contains("WAV (44.1 kHz, Stereo)"));
    }
}
