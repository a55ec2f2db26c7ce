// SPDX-License-Identifier: GPL-3.0-only

//! Terminal point cloud player
//!
//! Plays a point stream back in the terminal. Each UI tick advances the
//! [`PlaybackBuffer`] by at most one frame, copies a new frame into the
//! viewer's own point list and releases the buffer. Points are drawn
//! orthographically (looking down +Z) with Unicode half-block characters,
//! nearest point winning per sub-cell.

use crate::backends::Rgb;
use crate::constants::playback;
use crate::errors::StreamError;
use crate::stream::{PlaybackBuffer, Point, StreamReader, Tick};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, Read, stdout};
use std::path::Path;
use tracing::{error, info};

/// Play the stream at `path` until the user quits
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = StreamReader::open(path)?;
    let mut buffer = PlaybackBuffer::new(reader);
    info!(path = %path.display(), "Starting playback");

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut buffer);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Where the player is in the stream
#[derive(Debug, Clone, PartialEq)]
enum PlayerStatus {
    Playing,
    Paused,
    Ended,
    Failed(String),
}

/// Player state shared between the tick loop and the widgets
struct Player {
    cloud: CloudWidget,
    status: PlayerStatus,
    frames_shown: u64,
    empty_frames: u64,
}

impl Player {
    fn new() -> Self {
        Self {
            cloud: CloudWidget::new(),
            status: PlayerStatus::Playing,
            frames_shown: 0,
            empty_frames: 0,
        }
    }

    /// Advance the stream by one tick
    ///
    /// Reading continues after the end of the stream so frames appended
    /// later are still picked up.
    fn advance<R: Read>(&mut self, buffer: &mut PlaybackBuffer<R>) {
        if matches!(self.status, PlayerStatus::Paused | PlayerStatus::Failed(_)) {
            return;
        }
        match buffer.tick() {
            Ok(Tick::NewFrame(_)) => {
                if let Some(points) = buffer.points() {
                    self.cloud.stage(points, buffer.frame_index());
                }
                buffer.release();
                self.frames_shown += 1;
                self.status = PlayerStatus::Playing;
            }
            Ok(Tick::EmptyFrame) => {
                self.cloud.points.clear();
                self.empty_frames += 1;
                self.status = PlayerStatus::Playing;
            }
            // Last frame stays on screen
            Ok(Tick::EndOfStream) => self.status = PlayerStatus::Ended,
            Ok(Tick::Holding) => buffer.release(),
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&mut self, e: &StreamError) {
        error!("Playback stopped: {}", e);
        self.status = PlayerStatus::Failed(e.to_string());
    }

    fn toggle_pause(&mut self) {
        self.status = match self.status {
            PlayerStatus::Playing | PlayerStatus::Ended => PlayerStatus::Paused,
            PlayerStatus::Paused => PlayerStatus::Playing,
            ref other => other.clone(),
        };
    }

    fn status_message(&self) -> String {
        let state = match &self.status {
            PlayerStatus::Playing => "playing".to_string(),
            PlayerStatus::Paused => "paused".to_string(),
            PlayerStatus::Ended => "end of stream".to_string(),
            PlayerStatus::Failed(e) => format!("error: {}", e),
        };
        let frame = self
            .cloud
            .frame_index
            .map_or_else(|| "-".to_string(), |i| i.to_string());
        format!(
            "{} | frame {} | {} points | {} empty | space pause | q quit",
            state,
            frame,
            self.cloud.points.len(),
            self.empty_frames
        )
    }
}

fn run_app<R: Read>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    buffer: &mut PlaybackBuffer<R>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut player = Player::new();

    loop {
        player.advance(buffer);

        let status_message = player.status_message();
        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let cloud_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            f.render_widget(&player.cloud, cloud_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status_area,
            );
        })?;

        if event::poll(playback::TICK)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }
            if key.code == KeyCode::Char('q') {
                break;
            }
            if key.code == KeyCode::Char(' ') {
                player.toggle_pause();
            }
        }
    }

    info!(
        frames = player.frames_shown,
        empty = player.empty_frames,
        "Playback finished"
    );
    Ok(())
}

/// Rasterize points onto a `cols` x `rows` sub-pixel grid
///
/// The view spans `half_width_m` meters either side of the optical axis
/// horizontally, with the same scale vertically. Per sub-pixel, the point
/// with the smallest z wins.
pub fn rasterize(points: &[Point], cols: usize, rows: usize, half_width_m: f32) -> Vec<Option<Rgb>> {
    let mut colors = vec![None; cols * rows];
    if cols == 0 || rows == 0 || half_width_m <= 0.0 {
        return colors;
    }
    let mut depth = vec![f32::INFINITY; cols * rows];
    let scale = cols as f32 / (2.0 * half_width_m);
    let (cx, cy) = (cols as f32 / 2.0, rows as f32 / 2.0);

    for p in points {
        let px = (cx + p.x() * scale).floor();
        let py = (cy + p.y() * scale).floor();
        if px < 0.0 || py < 0.0 || px >= cols as f32 || py >= rows as f32 {
            continue;
        }
        let idx = py as usize * cols + px as usize;
        if p.z() < depth[idx] {
            depth[idx] = p.z();
            colors[idx] = Some(p.rgb());
        }
    }
    colors
}

/// Widget that renders the staged point cloud using half-block characters
struct CloudWidget {
    points: Vec<Point>,
    frame_index: Option<u64>,
    half_width_m: f32,
}

impl CloudWidget {
    fn new() -> Self {
        Self {
            points: Vec::new(),
            frame_index: None,
            half_width_m: playback::VIEW_HALF_WIDTH_M,
        }
    }

    /// Copy a frame out of the playback buffer
    fn stage(&mut self, points: &[Point], frame_index: Option<u64>) {
        self.points.clear();
        self.points.extend_from_slice(points);
        self.frame_index = frame_index;
    }
}

impl Widget for &CloudWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.frame_index.is_none() && self.points.is_empty() {
            let msg = "Waiting for points...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        }

        // Each terminal cell displays 2 vertical sub-pixels
        let cols = area.width as usize;
        let rows = area.height as usize * 2;
        let pixels = rasterize(&self.points, cols, rows, self.half_width_m);
        let color_at = |x: usize, y: usize| match pixels[y * cols + x] {
            Some([r, g, b]) => Color::Rgb(r, g, b),
            None => Color::Black,
        };

        for ty in 0..area.height {
            for tx in 0..area.width {
                let top = color_at(tx as usize, ty as usize * 2);
                let bottom = color_at(tx as usize, ty as usize * 2 + 1);
                if let Some(cell) = buf.cell_mut((area.x + tx, area.y + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamWriter;
    use std::io::Cursor;

    #[test]
    fn test_nearest_point_wins() {
        let far = Point::new([0.0, 0.0, 2.0], [1, 1, 1]);
        let near = Point::new([0.0, 0.0, 1.0], [9, 9, 9]);
        let pixels = rasterize(&[far, near], 10, 10, 1.0);
        assert_eq!(pixels[5 * 10 + 5], Some([9, 9, 9]));
        assert_eq!(pixels.iter().filter(|p| p.is_some()).count(), 1);
    }

    #[test]
    fn test_points_outside_view_are_dropped() {
        let p = Point::new([5.0, 0.0, 1.0], [1, 2, 3]);
        assert!(rasterize(&[p], 10, 10, 1.0).iter().all(Option::is_none));
    }

    #[test]
    fn test_player_keeps_last_frame_at_end() {
        let mut writer = StreamWriter::new(Vec::new());
        writer
            .write_frame(&[Point::new([0.0, 0.0, 1.0], [1, 2, 3]); 3])
            .unwrap();
        let bytes = writer.finish().unwrap();
        let mut playback = PlaybackBuffer::new(StreamReader::new(Cursor::new(bytes)));

        let mut player = Player::new();
        player.advance(&mut playback);
        assert_eq!(player.cloud.points.len(), 3);
        player.advance(&mut playback);
        assert_eq!(player.status, PlayerStatus::Ended);
        assert_eq!(player.cloud.points.len(), 3);
    }

    #[test]
    fn test_player_picks_up_appended_frames() {
        use std::fs::OpenOptions;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.pcs");
        std::fs::File::create(&path).unwrap();
        let mut buffer = PlaybackBuffer::new(StreamReader::open(&path).unwrap());

        let mut player = Player::new();
        player.advance(&mut buffer);
        assert_eq!(player.status, PlayerStatus::Ended);

        let file = OpenOptions::new().append(true).open(&path).unwrap();
        let mut writer = StreamWriter::new(file);
        writer
            .write_frame(&[Point::new([0.0, 0.0, 1.0], [1, 2, 3]); 2])
            .unwrap();
        writer.finish().unwrap();

        player.advance(&mut buffer);
        assert_eq!(player.status, PlayerStatus::Playing);
        assert_eq!(player.cloud.points.len(), 2);
        assert_eq!(player.frames_shown, 1);

        player.advance(&mut buffer);
        assert_eq!(player.status, PlayerStatus::Ended);
        assert_eq!(player.cloud.points.len(), 2);
    }

    #[test]
    fn test_pause_stops_reading() {
        let mut writer = StreamWriter::new(Vec::new());
        writer.write_frame(&[Point::default()]).unwrap();
        let bytes = writer.finish().unwrap();
        let mut playback = PlaybackBuffer::new(StreamReader::new(Cursor::new(bytes)));

        let mut player = Player::new();
        player.toggle_pause();
        player.advance(&mut playback);
        assert!(player.cloud.points.is_empty());
        player.toggle_pause();
        player.advance(&mut playback);
        assert_eq!(player.frames_shown, 1);
    }
}
