//! Pixel formats understood by the swap chain and the importer.

use std::fmt;

/// Builds a little-endian DRM fourcc code from its four characters.
const fn fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

/// DRM fourcc for `ARGB8888`.
pub const FOURCC_ARGB8888: u32 = fourcc(b'A', b'R', b'2', b'4');
/// DRM fourcc for `XRGB8888`.
pub const FOURCC_XRGB8888: u32 = fourcc(b'X', b'R', b'2', b'4');
/// DRM fourcc for `ABGR8888`.
pub const FOURCC_ABGR8888: u32 = fourcc(b'A', b'B', b'2', b'4');
/// DRM fourcc for `XBGR8888`.
pub const FOURCC_XBGR8888: u32 = fourcc(b'X', b'B', b'2', b'4');
/// DRM fourcc for `RGB565`.
pub const FOURCC_RGB565: u32 = fourcc(b'R', b'G', b'1', b'6');

/// Enumerates the pixel formats a window surface can be created with.
///
/// Each variant maps to a native visual id (the value a window system config
/// advertises) and to the DRM fourcc used when allocating and importing buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 32-bit ABGR, 8 bits per channel.
    Abgr8888,
    /// 32-bit XBGR, alpha ignored.
    Xbgr8888,
    /// 32-bit ARGB, 8 bits per channel, alpha first.
    Argb8888,
    /// 32-bit XRGB, alpha ignored.
    Xrgb8888,
    /// 16-bit RGB, 5/6/5 bits.
    Rgb565,
}

impl PixelFormat {
    /// Maps a native visual id onto a supported format.
    ///
    /// Returns `None` for every visual that has no GBM equivalent (the invalid
    /// id `0`, the packed 24-bit formats and the 16-bit alpha formats).
    pub fn from_visual_id(visual_id: u32) -> Option<Self> {
        match visual_id {
            1 => Some(Self::Abgr8888),
            2 => Some(Self::Xbgr8888),
            3 => Some(Self::Argb8888),
            4 => Some(Self::Xrgb8888),
            7 => Some(Self::Rgb565),
            _ => None,
        }
    }

    /// The native visual id this format was selected by.
    pub fn visual_id(self) -> u32 {
        match self {
            Self::Abgr8888 => 1,
            Self::Xbgr8888 => 2,
            Self::Argb8888 => 3,
            Self::Xrgb8888 => 4,
            Self::Rgb565 => 7,
        }
    }

    /// The DRM fourcc code handed to the allocator and the importer.
    pub fn fourcc(self) -> u32 {
        match self {
            Self::Argb8888 => FOURCC_ARGB8888,
            Self::Xrgb8888 => FOURCC_XRGB8888,
            Self::Abgr8888 => FOURCC_ABGR8888,
            Self::Xbgr8888 => FOURCC_XBGR8888,
            Self::Rgb565 => FOURCC_RGB565,
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Argb8888 | Self::Xrgb8888 | Self::Abgr8888 | Self::Xbgr8888 => 4,
            Self::Rgb565 => 2,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Abgr8888 => "ABGR8888",
            Self::Xbgr8888 => "XBGR8888",
            Self::Argb8888 => "ARGB8888",
            Self::Xrgb8888 => "XRGB8888",
            Self::Rgb565 => "RGB565",
        };
        f.write_str(name)
    }
}
