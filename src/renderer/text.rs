//! Score text rasterization
//!
//! A 3x5 pixel font is enough for the score readout; the texture is stretched
//! over the text sprite size by the pipeline.

use super::backend::Image;

const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;
/// Blank columns between glyphs
const SPACING: u32 = 1;

/// Rows of each glyph, top first; bit 2 is the left column
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

/// Render `score` as white digits on a transparent background.
///
/// `scale` is the number of texels per font pixel.
pub fn render_score(score: u64, scale: u32) -> Image {
    let scale = scale.max(1);
    let digits: Vec<usize> = score
        .to_string()
        .bytes()
        .map(|b| (b - b'0') as usize)
        .collect();

    let count = digits.len() as u32;
    let width = (count * (GLYPH_W + SPACING) - SPACING) * scale;
    let height = GLYPH_H * scale;
    let mut pixels = vec![0u8; (width * height * 4) as usize];

    for (i, &digit) in digits.iter().enumerate() {
        let origin_x = i as u32 * (GLYPH_W + SPACING);
        for (row, bits) in DIGITS[digit].iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                let px = (origin_x + col) * scale;
                let py = row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let idx = (((py + dy) * width + px + dx) * 4) as usize;
                        pixels[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
                    }
                }
            }
        }
    }

    Image {
        width,
        height,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(image: &Image, x: u32, y: u32) -> bool {
        image.pixels[((y * image.width + x) * 4 + 3) as usize] == 255
    }

    #[test]
    fn test_dimensions_grow_with_digits() {
        let one = render_score(7, 1);
        assert_eq!((one.width, one.height), (3, 5));
        assert!(one.is_consistent());

        let three = render_score(120, 2);
        assert_eq!((three.width, three.height), ((3 * 4 - 1) * 2, 10));
        assert!(three.is_consistent());
    }

    #[test]
    fn test_digit_one_shape() {
        let image = render_score(1, 1);
        // Middle column is lit on every row
        for y in 0..5 {
            assert!(lit(&image, 1, y));
        }
        assert!(!lit(&image, 0, 0));
        assert!(lit(&image, 0, 4));
    }

    #[test]
    fn test_zero_score_renders() {
        let image = render_score(0, 3);
        assert!(image.is_consistent());
        assert!(!lit(&image, 3, 3), "hollow centre of 0");
    }
}
