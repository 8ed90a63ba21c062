//! RGBA colour packed into a `u32`.

/// An RGBA colour packed as `0xRRGGBBAA`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Self = Self(0);
    pub const BLACK: Self = Self::from_rgb(0, 0, 0);
    pub const WHITE: Self = Self::from_rgb(255, 255, 255);

    /// Construct an opaque colour from RGB components.
    #[inline]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba(r, g, b, 255)
    }

    /// Construct from RGBA components.
    #[inline]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
    }

    #[inline]
    pub const fn r(self) -> u8 {
        ((self.0 >> 24) & 0xFF) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Same colour with a different alpha.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::from_rgba(self.r(), self.g(), self.b(), a)
    }

    /// Channel-wise average of several colours; transparent for none.
    pub fn average(colors: &[Color]) -> Color {
        if colors.is_empty() {
            return Color::TRANSPARENT;
        }
        let n = colors.len() as u32;
        let sum = colors.iter().fold([0u32; 4], |acc, c| {
            [
                acc[0] + c.r() as u32,
                acc[1] + c.g() as u32,
                acc[2] + c.b() as u32,
                acc[3] + c.a() as u32,
            ]
        });
        Color::from_rgba(
            (sum[0] / n) as u8,
            (sum[1] / n) as u8,
            (sum[2] / n) as u8,
            (sum[3] / n) as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_round_trip() {
        let c = Color::from_rgba(0xAB, 0xCD, 0xEF, 0x12);
        assert_eq!(c.r(), 0xAB);
        assert_eq!(c.g(), 0xCD);
        assert_eq!(c.b(), 0xEF);
        assert_eq!(c.a(), 0x12);
        assert_eq!(Color::from_rgb(1, 2, 3).a(), 255);
    }

    #[test]
    fn average_mixes_channels() {
        let c = Color::average(&[Color::from_rgb(200, 0, 0), Color::from_rgb(0, 0, 100)]);
        assert_eq!(c, Color::from_rgb(100, 0, 50));
        assert_eq!(Color::average(&[]), Color::TRANSPARENT);
    }
}
