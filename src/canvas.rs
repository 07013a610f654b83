use std::io::{self, Write};

use image::{imageops, imageops::FilterType, ImageBuffer, Rgba};

use crate::snapshot::PlayerSnapshot;

/// RGBA pixels with 16-bit channels, as produced by the art decoder.
pub type Bitmap = ImageBuffer<Rgba<u16>, Vec<u16>>;

const ANSI_CLEAR: &str = "\x1b[2J";
const ANSI_HOME: &str = "\x1b[H";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD: &str = "\x1b[1m";
const LOWER_HALF_BLOCK: char = '▄';

/// Resamples `art` onto a black `size` x `size` canvas.
///
/// Nearest-neighbour only, no aspect correction. Translucent pixels are
/// composited over the black destination, so their colour is premultiplied.
pub fn scale_to_canvas(art: Option<&Bitmap>, size: u32) -> Bitmap {
    let art = match art {
        Some(art) if art.width() > 0 && art.height() > 0 && size > 0 => art,
        _ => return Bitmap::new(size, size),
    };

    let mut canvas = imageops::resize(art, size, size, FilterType::Nearest);
    for pixel in canvas.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        *pixel = Rgba([premultiply(r, a), premultiply(g, a), premultiply(b, a), a]);
    }
    canvas
}

fn premultiply(channel: u16, alpha: u16) -> u16 {
    (u32::from(channel) * u32::from(alpha) / u32::from(u16::MAX)) as u16
}

/// Terminal colour channels are 8 bits wide; keep the most significant byte.
fn to_terminal_rgb(pixel: &Rgba<u16>) -> (u8, u8, u8) {
    let [r, g, b, _] = pixel.0;
    ((r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8)
}

/// Number of printed rows for a canvas of `size` pixel rows. A trailing odd row is dropped.
pub fn row_pairs(size: u32) -> u32 {
    size / 2
}

/// Clears the screen and paints the snapshot's art and text.
///
/// Each printed row holds two pixel rows: the top pixel is the cell
/// background, the bottom one the foreground of a lower half block. The
/// first four rows carry title, artist, album and status; lines that don't
/// fit a small canvas are left out. The cursor is left after the last glyph.
pub fn render<W: Write + ?Sized>(
    out: &mut W,
    snapshot: &PlayerSnapshot,
    size: u32,
) -> io::Result<()> {
    let canvas = scale_to_canvas(snapshot.art.as_ref(), size);
    write!(out, "{ANSI_CLEAR}{ANSI_HOME}")?;

    let pairs = row_pairs(size);
    for pair in 0..pairs {
        let y = pair * 2;
        for x in 0..size {
            let (r, g, b) = to_terminal_rgb(canvas.get_pixel(x, y));
            write!(out, "\x1b[48;2;{r};{g};{b}m")?;
            let (r, g, b) = to_terminal_rgb(canvas.get_pixel(x, y + 1));
            write!(out, "\x1b[38;2;{r};{g};{b}m{LOWER_HALF_BLOCK}")?;
        }
        out.write_all(ANSI_RESET.as_bytes())?;
        write_caption(out, snapshot, pair)?;
        if pair + 1 < pairs {
            out.write_all(b"\n")?;
        }
    }

    out.flush()
}

fn write_caption<W: Write + ?Sized>(
    out: &mut W,
    snapshot: &PlayerSnapshot,
    pair: u32,
) -> io::Result<()> {
    match pair {
        0 => write!(out, " {ANSI_BOLD}{}{ANSI_RESET}", snapshot.title),
        1 => write!(out, " {}", snapshot.artist),
        2 => write!(out, " {}", snapshot.album),
        3 => match snapshot.status.glyph() {
            Some(glyph) => write!(out, " {ANSI_BOLD}{glyph}{ANSI_RESET}"),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::snapshot::PlaybackStatus;

    fn solid(size: u32, pixel: [u16; 4]) -> Bitmap {
        ImageBuffer::from_pixel(size, size, Rgba(pixel))
    }

    fn render_to_string(snapshot: &PlayerSnapshot, size: u32) -> String {
        let mut out = Vec::new();
        render(&mut out, snapshot, size).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Text printed after the image cells of each printed row.
    fn captions(output: &str) -> Vec<String> {
        output
            .split('\n')
            .map(|line| {
                let (_, caption) = line.rsplit_once(LOWER_HALF_BLOCK).unwrap();
                caption.strip_prefix(ANSI_RESET).unwrap().to_string()
            })
            .collect()
    }

    fn tagged_snapshot() -> PlayerSnapshot {
        PlayerSnapshot {
            title: "A".into(),
            artist: "B".into(),
            album: "C".into(),
            status: PlaybackStatus::Playing,
            ..Default::default()
        }
    }

    #[test]
    fn output_starts_with_clear_and_home() {
        let output = render_to_string(&PlayerSnapshot::default(), 4);
        assert!(output.starts_with("\x1b[2J\x1b[H"));
    }

    #[test]
    fn renders_half_as_many_rows_as_pixels() {
        for size in [2, 8, 20, 21] {
            let output = render_to_string(&PlayerSnapshot::default(), size);
            assert_eq!(output.split('\n').count() as u32, size / 2);
            assert_eq!(
                output.matches(LOWER_HALF_BLOCK).count() as u32,
                (size / 2) * size
            );
        }
    }

    #[test]
    fn odd_canvas_drops_the_unpaired_row() {
        let mut art = solid(5, [0, 0, 0, u16::MAX]);
        for x in 0..5 {
            art.put_pixel(x, 4, Rgba([u16::MAX, u16::MAX, u16::MAX, u16::MAX]));
        }
        let snapshot = PlayerSnapshot {
            art: Some(art),
            ..Default::default()
        };
        let output = render_to_string(&snapshot, 5);
        assert_eq!(output.split('\n').count(), 2);
        assert!(!output.contains("255;255;255"));
    }

    #[test]
    fn last_row_has_no_trailing_newline() {
        let output = render_to_string(&tagged_snapshot(), 10);
        assert!(!output.ends_with('\n'));
        assert!(output.ends_with(ANSI_RESET));
    }

    #[test]
    fn missing_art_matches_black_art() {
        let blank = render_to_string(&tagged_snapshot(), 12);
        let black = render_to_string(
            &PlayerSnapshot {
                art: Some(solid(7, [0, 0, 0, u16::MAX])),
                ..tagged_snapshot()
            },
            12,
        );
        assert_eq!(blank, black);
        assert!(blank.contains("\x1b[48;2;0;0;0m\x1b[38;2;0;0;0m▄"));
    }

    #[test]
    fn captions_follow_row_positions() {
        let output = render_to_string(&tagged_snapshot(), 10);
        assert_eq!(
            captions(&output),
            vec![
                " \x1b[1mA\x1b[0m".to_string(),
                " B".to_string(),
                " C".to_string(),
                " \x1b[1m▶\x1b[0m".to_string(),
                String::new(),
            ]
        );
    }

    #[test]
    fn small_canvas_omits_captions_that_do_not_fit() {
        let output = render_to_string(&tagged_snapshot(), 6);
        assert_eq!(
            captions(&output),
            vec![
                " \x1b[1mA\x1b[0m".to_string(),
                " B".to_string(),
                " C".to_string(),
            ]
        );
        assert!(!output.contains('▶'));
    }

    #[test]
    fn unknown_status_leaves_status_row_blank() {
        let snapshot = PlayerSnapshot {
            status: PlaybackStatus::Unknown,
            ..tagged_snapshot()
        };
        let output = render_to_string(&snapshot, 8);
        assert_eq!(captions(&output)[3], "");
    }

    #[test]
    fn colour_uses_most_significant_byte() {
        let snapshot = PlayerSnapshot {
            art: Some(solid(2, [0xABCD, 0x12FF, 0x0001, u16::MAX])),
            ..Default::default()
        };
        let output = render_to_string(&snapshot, 2);
        assert!(output.contains("\x1b[48;2;171;18;0m\x1b[38;2;171;18;0m▄"));
    }

    #[test]
    fn translucent_pixels_are_darkened() {
        let half = u16::MAX / 2 + 1;
        let canvas = scale_to_canvas(Some(&solid(1, [u16::MAX, 0, 0, half])), 2);
        let (r, g, b) = to_terminal_rgb(canvas.get_pixel(1, 1));
        assert_eq!((r, g, b), (128, 0, 0));
    }

    #[test]
    fn scaling_ignores_aspect_ratio() {
        let mut art: Bitmap = ImageBuffer::from_pixel(4, 2, Rgba([0, 0, 0, u16::MAX]));
        for y in 0..2 {
            art.put_pixel(2, y, Rgba([u16::MAX, u16::MAX, u16::MAX, u16::MAX]));
            art.put_pixel(3, y, Rgba([u16::MAX, u16::MAX, u16::MAX, u16::MAX]));
        }
        let canvas = scale_to_canvas(Some(&art), 4);
        assert_eq!(canvas.dimensions(), (4, 4));
        assert_eq!(canvas.get_pixel(0, 3).0[0], 0);
        assert_eq!(canvas.get_pixel(3, 3).0[0], u16::MAX);
    }

    #[test]
    fn tiny_canvas_renders_only_the_clear() {
        let output = render_to_string(&tagged_snapshot(), 1);
        assert_eq!(output, "\x1b[2J\x1b[H");
    }
}
