//! The fixed rendition ladder, highest quality first.

/// One target quality level of the output package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionSpec {
    /// Label used as the rendition's subdirectory and playlist URI prefix.
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    /// Target video bitrate, in the encoder's notation.
    pub bitrate: &'static str,
    /// Nominal bits per second advertised in the master playlist.
    pub bandwidth: u64,
}

const LADDER: [RenditionSpec; 4] = [
    RenditionSpec {
        name: "1080p",
        width: 1920,
        height: 1080,
        bitrate: "5000k",
        bandwidth: 5_000_000,
    },
    RenditionSpec {
        name: "720p",
        width: 1280,
        height: 720,
        bitrate: "2500k",
        bandwidth: 2_500_000,
    },
    RenditionSpec {
        name: "480p",
        width: 854,
        height: 480,
        bitrate: "1000k",
        bandwidth: 1_000_000,
    },
    RenditionSpec {
        name: "360p",
        width: 640,
        height: 360,
        bitrate: "600k",
        bandwidth: 600_000,
    },
];

/// Returns the rendition ladder. Callers must keep this order.
pub fn rendition_ladder() -> &'static [RenditionSpec] {
    &LADDER
}
