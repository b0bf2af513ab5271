use super::error::TranscodeError;
use super::ladder::RenditionSpec;
use super::layout::{RENDITION_PLAYLIST, SUBTITLES_DIR};
use std::fmt::Write as _;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub struct VariantStream {
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
    pub uri: String,
}

pub struct MasterPlaylist {
    /// URI of the WebVTT subtitle rendition, if any.
    pub subtitles: Option<String>,
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn new() -> Self {
        Self {
            subtitles: None,
            variants: Vec::new(),
        }
    }

    /// One variant per rendition, in ladder order.
    pub fn from_ladder(ladder: &[RenditionSpec], subtitle_base: Option<&str>) -> Self {
        let mut playlist = Self::new();
        playlist.subtitles =
            subtitle_base.map(|base| format!("{}/{}.vtt", SUBTITLES_DIR, base));
        for rendition in ladder {
            playlist.add_variant(
                rendition.bandwidth,
                rendition.width,
                rendition.height,
                format!("{}/{}", rendition.name, RENDITION_PLAYLIST),
            );
        }
        playlist
    }

    pub fn add_variant(&mut self, bandwidth: u64, width: u32, height: u32, uri: String) {
        self.variants.push(VariantStream {
            bandwidth,
            width,
            height,
            uri,
        });
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n");

        if let Some(uri) = &self.subtitles {
            let _ = writeln!(
                out,
                "#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"English\",LANGUAGE=\"en\",DEFAULT=YES,AUTOSELECT=YES,URI=\"{}\"",
                uri
            );
        }

        for variant in &self.variants {
            let _ = writeln!(
                out,
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}",
                variant.bandwidth, variant.width, variant.height
            );
            out.push_str(&variant.uri);
            out.push('\n');
        }

        out
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), TranscodeError> {
        let io_err = |e| TranscodeError::filesystem(path, e);

        let mut file = File::create(path).await.map_err(io_err)?;
        file.write_all(self.render().as_bytes())
            .await
            .map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        Ok(())
    }
}

impl Default for MasterPlaylist {
    fn default() -> Self {
        Self::new()
    }
}

/// Master playlist text for `ladder`. `subtitle_base` is the job's base name
/// when a subtitle track exists.
pub fn build_master(ladder: &[RenditionSpec], subtitle_base: Option<&str>) -> String {
    MasterPlaylist::from_ladder(ladder, subtitle_base).render()
}
