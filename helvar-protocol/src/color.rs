//! Conversion of colours into the CIE 1931 chromaticity coordinates used by
//! colour capable direct level commands.

/// D65 white point, used for colours without any luminance.
pub const WHITE_POINT: Chromaticity = Chromaticity {
    x: 0.3127,
    y: 0.3290,
};

/// A point in the CIE 1931 xy chromaticity diagram.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

/// An 8 bit sRGB colour.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }
}

impl From<Rgb> for Chromaticity {
    fn from(value: Rgb) -> Self {
        let (x, y) = rgb_to_xy(value.r, value.g, value.b);
        Chromaticity { x, y }
    }
}

impl From<(f64, f64)> for Chromaticity {
    fn from((x, y): (f64, f64)) -> Self {
        Chromaticity { x, y }
    }
}

// sRGB transfer function
fn linearize(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Converts an sRGB colour into xy chromaticity coordinates.
pub fn rgb_to_xy(r: u8, g: u8, b: u8) -> (f64, f64) {
    let (r, g, b) = (linearize(r), linearize(g), linearize(b));

    let x = 0.4124 * r + 0.3576 * g + 0.1805 * b;
    let y = 0.2126 * r + 0.7152 * g + 0.0722 * b;
    let z = 0.0193 * r + 0.1192 * g + 0.9505 * b;

    let sum = x + y + z;
    if sum <= f64::EPSILON {
        return (WHITE_POINT.x, WHITE_POINT.y);
    }
    (x / sum, y / sum)
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 0.001 && (actual.1 - expected.1).abs() < 0.001,
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn primaries() {
        assert_close(rgb_to_xy(255, 0, 0), (0.6401, 0.3300));
        assert_close(rgb_to_xy(0, 255, 0), (0.3000, 0.6000));
        assert_close(rgb_to_xy(0, 0, 255), (0.1500, 0.0600));
    }

    #[test]
    fn white_and_black_map_to_white_point() {
        assert_close(rgb_to_xy(255, 255, 255), (0.3127, 0.3290));
        assert_close(rgb_to_xy(0, 0, 0), (WHITE_POINT.x, WHITE_POINT.y));
    }

    #[test]
    fn grey_has_white_chromaticity() {
        let Chromaticity { x, y } = Rgb::new(128, 128, 128).into();
        assert_close((x, y), (0.3127, 0.3290));
    }
}
