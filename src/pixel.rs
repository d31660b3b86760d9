//! Pixel formats and framebuffer encoding
//!
//! The backend negotiates one wl_shm format for the configured color
//! depth and writes every rectangle the rendering library produces
//! into the window's backing memory in that encoding. Depths of 8 bits
//! and above are a direct per-pixel copy; the 1-bit depth synthesizes
//! an RGB332 byte from quantized channel bits, as the wire has no
//! sub-byte format.

use serde::{Deserialize, Serialize};
use wayland_client::protocol::wl_shm;

use crate::area::Area;

/// Color depth of the rendering library's pixel pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorDepth {
    #[default]
    Depth32,
    Depth16,
    Depth8,
    Depth1,
}

/// One pixel as handed over by the rendering library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Rgba = Rgba::new(0xFF, 0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgba = Rgba::new(0x00, 0x00, 0x00, 0xFF);
}

/// A negotiated wl_shm pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Argb8888,
    Xrgb8888,
    Rgb565,
    Rgb332,
    /// 1-bit render depth carried as RGB332 on the wire.
    Mono,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Argb8888 | PixelFormat::Xrgb8888 => 4,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb332 | PixelFormat::Mono => 1,
        }
    }

    pub fn wl_format(&self) -> wl_shm::Format {
        match self {
            PixelFormat::Argb8888 => wl_shm::Format::Argb8888,
            PixelFormat::Xrgb8888 => wl_shm::Format::Xrgb8888,
            PixelFormat::Rgb565 => wl_shm::Format::Rgb565,
            PixelFormat::Rgb332 | PixelFormat::Mono => wl_shm::Format::Rgb332,
        }
    }

    /// Encode one pixel into `out`, which must hold `bytes_per_pixel()`
    /// bytes. Multi-byte formats are little-endian, matching wl_shm.
    pub fn encode(&self, px: Rgba, out: &mut [u8]) {
        match self {
            PixelFormat::Argb8888 => {
                let v = ((px.a as u32) << 24)
                    | ((px.r as u32) << 16)
                    | ((px.g as u32) << 8)
                    | (px.b as u32);
                out[..4].copy_from_slice(&v.to_le_bytes());
            }
            PixelFormat::Xrgb8888 => {
                let v = 0xFF00_0000u32
                    | ((px.r as u32) << 16)
                    | ((px.g as u32) << 8)
                    | (px.b as u32);
                out[..4].copy_from_slice(&v.to_le_bytes());
            }
            PixelFormat::Rgb565 => {
                let v = (((px.r as u16) >> 3) << 11)
                    | (((px.g as u16) >> 2) << 5)
                    | ((px.b as u16) >> 3);
                out[..2].copy_from_slice(&v.to_le_bytes());
            }
            PixelFormat::Rgb332 => {
                out[0] = (px.r & 0xE0) | ((px.g & 0xE0) >> 3) | (px.b >> 6);
            }
            PixelFormat::Mono => {
                // Quantize each channel to one bit, then spread it over
                // the RGB332 wire byte.
                let r = (px.r >= 0x80) as u8;
                let g = (px.g >= 0x80) as u8;
                let b = (px.b >= 0x80) as u8;
                out[0] = ((0x07 * r) << 5) | ((0x07 * g) << 2) | (0x03 * b);
            }
        }
    }
}

/// Tracks the wl_shm format advertisements and keeps the best match
/// for the configured depth. At 32-bit depth ARGB wins over XRGB.
#[derive(Debug)]
pub struct FormatNegotiation {
    depth: ColorDepth,
    chosen: Option<PixelFormat>,
}

impl FormatNegotiation {
    pub fn new(depth: ColorDepth) -> Self {
        Self {
            depth,
            chosen: None,
        }
    }

    pub fn offer(&mut self, format: wl_shm::Format) {
        match (self.depth, format) {
            (ColorDepth::Depth32, wl_shm::Format::Argb8888) => {
                self.chosen = Some(PixelFormat::Argb8888);
            }
            (ColorDepth::Depth32, wl_shm::Format::Xrgb8888) => {
                if self.chosen != Some(PixelFormat::Argb8888) {
                    self.chosen = Some(PixelFormat::Xrgb8888);
                }
            }
            (ColorDepth::Depth16, wl_shm::Format::Rgb565) => {
                self.chosen = Some(PixelFormat::Rgb565);
            }
            (ColorDepth::Depth8, wl_shm::Format::Rgb332) => {
                self.chosen = Some(PixelFormat::Rgb332);
            }
            (ColorDepth::Depth1, wl_shm::Format::Rgb332) => {
                self.chosen = Some(PixelFormat::Mono);
            }
            _ => {}
        }
    }

    pub fn chosen(&self) -> Option<PixelFormat> {
        self.chosen
    }

    pub fn depth(&self) -> ColorDepth {
        self.depth
    }
}

/// Write `pixels` (row-major, sized for `area`) into `map` at their
/// row-major offsets for a `width` x `height` target. Pixels falling
/// outside the target are skipped; the caller has already rejected
/// fully-outside areas.
pub(crate) fn blit(
    map: &mut [u8],
    format: PixelFormat,
    width: i32,
    height: i32,
    area: Area,
    pixels: &[Rgba],
) {
    let bpp = format.bytes_per_pixel();
    let area_w = area.width();

    for y in area.y1..=area.y2 {
        if y < 0 || y >= height {
            continue;
        }
        for x in area.x1..=area.x2 {
            if x < 0 || x >= width {
                continue;
            }
            let src = ((y - area.y1) * area_w + (x - area.x1)) as usize;
            let dst = ((y * width) + x) as usize * bpp;
            if let Some(px) = pixels.get(src) {
                format.encode(*px, &mut map[dst..dst + bpp]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rgb565_white_is_all_ones() {
        let mut out = [0u8; 2];
        PixelFormat::Rgb565.encode(Rgba::WHITE, &mut out);
        assert_eq!(u16::from_le_bytes(out), 0xFFFF);
    }

    #[test]
    fn argb_encoding_layout() {
        let mut out = [0u8; 4];
        PixelFormat::Argb8888.encode(Rgba::new(0x11, 0x22, 0x33, 0x44), &mut out);
        assert_eq!(u32::from_le_bytes(out), 0x4411_2233);

        PixelFormat::Xrgb8888.encode(Rgba::new(0x11, 0x22, 0x33, 0x00), &mut out);
        assert_eq!(u32::from_le_bytes(out), 0xFF11_2233);
    }

    #[test]
    fn mono_synthesizes_quantized_channels() {
        let mut out = [0u8; 1];
        PixelFormat::Mono.encode(Rgba::WHITE, &mut out);
        assert_eq!(out[0], 0xFF);
        PixelFormat::Mono.encode(Rgba::new(0xFF, 0x00, 0x00, 0xFF), &mut out);
        assert_eq!(out[0], 0b1110_0000);
        PixelFormat::Mono.encode(Rgba::BLACK, &mut out);
        assert_eq!(out[0], 0x00);
    }

    #[test]
    fn negotiation_prefers_argb_over_xrgb() {
        let mut neg = FormatNegotiation::new(ColorDepth::Depth32);
        neg.offer(wl_shm::Format::Xrgb8888);
        assert_eq!(neg.chosen(), Some(PixelFormat::Xrgb8888));
        neg.offer(wl_shm::Format::Argb8888);
        assert_eq!(neg.chosen(), Some(PixelFormat::Argb8888));
        // A later XRGB offer must not displace ARGB.
        neg.offer(wl_shm::Format::Xrgb8888);
        assert_eq!(neg.chosen(), Some(PixelFormat::Argb8888));
    }

    #[test]
    fn negotiation_ignores_foreign_depths() {
        let mut neg = FormatNegotiation::new(ColorDepth::Depth16);
        neg.offer(wl_shm::Format::Argb8888);
        assert_eq!(neg.chosen(), None);
        neg.offer(wl_shm::Format::Rgb565);
        assert_eq!(neg.chosen(), Some(PixelFormat::Rgb565));
    }

    #[test]
    fn blit_writes_rgb565_rows() {
        let (w, h) = (320, 240);
        let mut map = vec![0u8; (w * h) as usize * 2];
        let area = Area::new(0, 0, 9, 9);
        let pixels = vec![Rgba::WHITE; 100];

        blit(&mut map, PixelFormat::Rgb565, w, h, area, &pixels);

        for y in 0..10 {
            for x in 0..10 {
                let off = ((y * w + x) as usize) * 2;
                assert_eq!(u16::from_le_bytes([map[off], map[off + 1]]), 0xFFFF);
            }
            // First pixel past the rectangle is untouched.
            let off = ((y * w + 10) as usize) * 2;
            assert_eq!(u16::from_le_bytes([map[off], map[off + 1]]), 0x0000);
        }
    }

    #[test]
    fn blit_clips_partial_overlap() {
        let (w, h) = (16, 16);
        let mut map = vec![0u8; (w * h) as usize];
        let area = Area::new(14, 14, 17, 17);
        let pixels = vec![Rgba::WHITE; 16];

        blit(&mut map, PixelFormat::Rgb332, w, h, area, &pixels);

        let written = map.iter().filter(|&&b| b != 0).count();
        assert_eq!(written, 4); // only the 2x2 in-bounds corner
        assert_ne!(map[(15 * w + 15) as usize], 0);
    }

    proptest! {
        /// Fully out-of-bounds areas never touch the mapping.
        #[test]
        fn outside_area_writes_nothing(
            x1 in -500i32..500,
            y1 in -500i32..500,
            dw in 0i32..32,
            dh in 0i32..32,
        ) {
            let (w, h) = (64, 48);
            let area = Area::new(x1, y1, x1 + dw, y1 + dh);
            prop_assume!(area.is_outside(w, h));

            let mut map = vec![0u8; (w * h) as usize * 4];
            let pixels = vec![Rgba::WHITE; (area.width() * area.height()) as usize];
            blit(&mut map, PixelFormat::Argb8888, w, h, area, &pixels);
            prop_assert!(map.iter().all(|&b| b == 0));
        }
    }
}
