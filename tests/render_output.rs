use std::collections::VecDeque;

use image::{Rgba, RgbaImage};
use now_playing_term::{
    CanvasConfig, FileArtResolver, PlaybackStatus, PlayerUpdate, RenderDriver, SourceError,
    StateSource, TerminalSize, Track,
};
use pretty_assertions::assert_eq;
use url::Url;

struct FixedRows(u16);

impl TerminalSize for FixedRows {
    fn rows(&self) -> Option<u16> {
        Some(self.0)
    }
}

struct Samples(VecDeque<PlayerUpdate>);

impl StateSource for Samples {
    fn snapshot(&mut self) -> Result<PlayerUpdate, SourceError> {
        self.0
            .pop_front()
            .ok_or_else(|| SourceError::Malformed("no more samples".into()))
    }
}

fn expected_frame(rows: &[&str; 10], cell: &str) -> String {
    let mut expected = String::from("\x1b[2J\x1b[H");
    for (index, caption) in rows.iter().enumerate() {
        expected.push_str(&cell.repeat(20));
        expected.push_str("\x1b[0m");
        expected.push_str(caption);
        if index + 1 < rows.len() {
            expected.push('\n');
        }
    }
    expected
}

#[test]
fn red_cover_with_track_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.png");
    RgbaImage::from_pixel(20, 20, Rgba([255, 0, 0, 255]))
        .save(&path)
        .unwrap();

    let mut source = Samples(VecDeque::from([PlayerUpdate {
        track: Some(Track {
            title: "Viva La Mexico".into(),
            artist: "A Day To Remember".into(),
            album: "You're Welcome".into(),
            art_url: Some(Url::from_file_path(&path).unwrap().to_string()),
        }),
        status: Some(PlaybackStatus::Playing),
    }]));

    let mut driver = RenderDriver::new(
        FileArtResolver,
        FixedRows(10),
        Vec::new(),
        CanvasConfig::default(),
    );
    assert!(driver.tick(&mut source).unwrap());

    let output = String::from_utf8(driver.output().clone()).unwrap();
    let expected = expected_frame(
        &[
            " \x1b[1mViva La Mexico\x1b[0m",
            " A Day To Remember",
            " You're Welcome",
            " \x1b[1m▶\x1b[0m",
            "",
            "",
            "",
            "",
            "",
            "",
        ],
        "\x1b[48;2;255;0;0m\x1b[38;2;255;0;0m▄",
    );
    assert_eq!(output, expected);
}

#[test]
fn unreadable_cover_renders_black() {
    let mut source = Samples(VecDeque::from([PlayerUpdate {
        track: Some(Track {
            title: "Untitled".into(),
            art_url: Some("file:///nonexistent/cover.png".into()),
            ..Default::default()
        }),
        status: None,
    }]));

    let mut driver = RenderDriver::new(
        FileArtResolver,
        FixedRows(10),
        Vec::new(),
        CanvasConfig::default(),
    );
    assert!(driver.tick(&mut source).unwrap());
    assert!(driver.snapshot().art.is_none());

    let output = String::from_utf8(driver.output().clone()).unwrap();
    let expected = expected_frame(
        &[
            " \x1b[1mUntitled\x1b[0m",
            " ",
            " ",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ],
        "\x1b[48;2;0;0;0m\x1b[38;2;0;0;0m▄",
    );
    assert_eq!(output, expected);
}
