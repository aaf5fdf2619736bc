//! Text measurement and encoding for the built-in Helvetica face.

/// Advance widths (1/1000 em) of Helvetica for code points 32..=126.
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const COPYRIGHT_WIDTH: u16 = 737;
const FALLBACK_WIDTH: u16 = 556;

/// Distance from the top of a line box to the baseline, as a fraction of the
/// font size (Helvetica ascender).
pub const ASCENT: f32 = 0.718;

/// Underline offset below the baseline and its thickness, in em.
pub const UNDERLINE_OFFSET: f32 = 0.1;
pub const UNDERLINE_THICKNESS: f32 = 0.05;

fn char_width(c: char) -> u16 {
    match c {
        ' '..='~' => HELVETICA_ASCII_WIDTHS[c as usize - 32],
        '©' => COPYRIGHT_WIDTH,
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in points at `size`.
pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    units as f32 * size / 1000.0
}

/// Encodes `text` for a WinAnsi Type1 font. Characters outside the table
/// become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '©' => 0xA9,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_digits_and_letters() {
        // "10" is two 556-unit digits.
        assert!((text_width("10", 10.0) - 11.12).abs() < 1e-4);
        assert!(text_width("W", 12.0) > text_width("i", 12.0));
    }

    #[test]
    fn encodes_copyright_sign() {
        assert_eq!(encode_win_ansi("© 2026"), vec![0xA9, b' ', b'2', b'0', b'2', b'6']);
        assert_eq!(encode_win_ansi("€"), vec![b'?']);
    }
}
