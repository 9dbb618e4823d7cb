use crate::asteroid::Asteroid;
use crate::background::ParticleField;
use crate::game::{GameView, LogLevel, Phase};
use crate::planet::{draw_planet, Placement};
use crate::selector::{PetSelector, SelectorPhase};
use crate::theme::Palette;
use crate::timer::progress;
use crate::vitals::{Severity, VitalKind};
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, fg: Color, bg: Color) {
        self.cells.fill(Cell { ch: ' ', fg, bg });
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Pixel>,
}

impl PixelCanvas {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn clear(&mut self) {
        self.px.fill(Pixel::default());
    }
    pub(crate) fn blend_over(&mut self, x: i32, y: i32, src: Pixel) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0;

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    pub(crate) canvas: PixelCanvas,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            EnableMouseCapture,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;

        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            // Braille: 2×4 pixels per cell
            canvas: PixelCanvas::new(cols as u32 * 2, rows as u32 * 4),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            DisableMouseCapture,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        self.canvas = PixelCanvas::new(c as u32 * 2, r as u32 * 4);
        Ok(true)
    }

    /// Canvas size in sub-pixels, the unit the background and asteroids use.
    pub(crate) fn field_size(&self) -> (f32, f32) {
        (self.canvas.w as f32, self.canvas.h as f32)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Braille encoding: 2×4 pixels -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    // (0,0)=1 (0,1)=2 (0,2)=4 (0,3)=64
    // (1,0)=8 (1,1)=16 (1,2)=32 (1,3)=128
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Encodes the canvas into braille cells. Cells with no ink keep whatever
/// was drawn there before.
pub(crate) fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer, enable_color: bool, palette: &Palette) {
    for cy in 0..out.h as u32 {
        for cx in 0..out.w as u32 {
            let mut mask: u8 = 0;
            let (mut sum_r, mut sum_g, mut sum_b, mut ink) = (0u32, 0u32, 0u32, 0u32);

            for dy in 0..4 {
                for dx in 0..2 {
                    let (x, y) = (cx * 2 + dx, cy * 4 + dy);
                    if x >= canvas.w || y >= canvas.h {
                        continue;
                    }
                    let p = canvas.px[canvas.idx(x, y)];
                    // threshold: treat alpha as ink
                    if p.a >= 32 {
                        mask |= braille_bit(dx, dy);
                        sum_r += p.r as u32;
                        sum_g += p.g as u32;
                        sum_b += p.b as u32;
                        ink += 1;
                    }
                }
            }
            if ink == 0 {
                continue;
            }

            let ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
            let fg = if enable_color {
                Color::Rgb {
                    r: (sum_r / ink) as u8,
                    g: (sum_g / ink) as u8,
                    b: (sum_b / ink) as u8,
                }
            } else {
                palette.fg
            };
            out.set(cx as u16, cy as u16, Cell { ch, fg, bg: palette.bg });
        }
    }
}

/* -----------------------------
   Scene painters
------------------------------ */

pub(crate) fn draw_field(canvas: &mut PixelCanvas, field: &ParticleField, palette: &Palette, now_ms: u64) {
    let opacity = field.opacity(now_ms);
    if opacity <= 0.0 {
        return;
    }
    let (r, g, b) = palette.dot;
    let (gr, gg, gb) = palette.dot_glow;
    for dot in field.dots() {
        let reach = dot.radius.ceil() as i32 + 1;
        let (cx, cy) = (dot.x.round() as i32, dot.y.round() as i32);
        for y in -reach..=reach {
            for x in -reach..=reach {
                let d = ((x * x + y * y) as f32).sqrt();
                let (px, a) = if d <= dot.radius * 0.5 {
                    (Pixel { r, g, b, a: 0 }, 230.0)
                } else if d <= dot.radius + 0.5 {
                    (Pixel { r: gr, g: gg, b: gb, a: 0 }, 90.0)
                } else {
                    continue;
                };
                let a = (a * opacity) as u8;
                canvas.blend_over(cx + x, cy + y, Pixel { a, ..px });
            }
        }
    }
}

/// Asteroid positions are in sub-pixels; each one is a single glyph cell.
pub(crate) fn draw_asteroids(buf: &mut CellBuffer, asteroids: &[Asteroid], palette: &Palette, now_ms: u64) {
    for a in asteroids {
        let Some((x, y)) = a.cell_at(now_ms) else {
            continue;
        };
        // a dismissed sprite dims, then crumbles to a speck
        let opacity = a.opacity(now_ms);
        let (ch, fg) = match opacity {
            o if o >= 1.0 => (a.glyph(now_ms), palette.highlight),
            o if o >= 0.5 => (a.glyph(now_ms), palette.dim),
            _ => ('·', palette.dim),
        };
        buf.set(x, y, Cell { ch, fg, bg: palette.bg });
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

fn draw_centered(buf: &mut CellBuffer, y: u16, s: &str, fg: Color, bg: Color) {
    let len = s.chars().count() as u16;
    draw_text(buf, buf.w.saturating_sub(len) / 2, y, s, fg, bg);
}

fn bar(value01: f32, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { '·' });
    }
    s.push(']');
    s
}

pub(crate) fn draw_box(buf: &mut CellBuffer, x0: u16, y0: u16, bw: u16, bh: u16, fg: Color, bg: Color) {
    if bw < 2 || bh < 2 {
        return;
    }
    let cell = |ch| Cell { ch, fg, bg };
    for x in x0 + 1..x0 + bw - 1 {
        buf.set(x, y0, cell('─'));
        buf.set(x, y0 + bh - 1, cell('─'));
    }
    for y in y0 + 1..y0 + bh - 1 {
        buf.set(x0, y, cell('│'));
        buf.set(x0 + bw - 1, y, cell('│'));
        for x in x0 + 1..x0 + bw - 1 {
            buf.set(x, y, cell(' '));
        }
    }
    buf.set(x0, y0, cell('┌'));
    buf.set(x0 + bw - 1, y0, cell('┐'));
    buf.set(x0, y0 + bh - 1, cell('└'));
    buf.set(x0 + bw - 1, y0 + bh - 1, cell('┘'));
}

pub(crate) fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in s.split_whitespace() {
        let len = line.chars().count();
        if len > 0 && len + 1 + word.chars().count() > width.max(8) {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Local wall-clock time of a log entry.
fn clock_label(at_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(at_ms as i64)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn severity_color(severity: Severity, palette: &Palette) -> Color {
    match severity {
        Severity::Normal => palette.fg,
        Severity::Warning => Color::Rgb { r: 235, g: 180, b: 60 },
        Severity::Critical | Severity::Zero => Color::Rgb { r: 235, g: 70, b: 70 },
    }
}

fn level_color(level: LogLevel, palette: &Palette) -> Color {
    match level {
        LogLevel::Info => palette.dim,
        LogLevel::Notice => palette.fg,
        LogLevel::Warning => severity_color(Severity::Warning, palette),
        LogLevel::Critical | LogLevel::Fatal => severity_color(Severity::Critical, palette),
    }
}

/// Pet gallery, the isolated card, and the intro narration.
pub(crate) fn draw_selector(
    term: &mut Terminal,
    sel: &PetSelector,
    palette: &Palette,
    enable_color: bool,
    now_ms: u64,
) {
    let (cols, rows) = (term.cols, term.rows);
    let (w, h) = term.field_size();
    let radius = (h * 0.28).min(w * 0.22);
    let spin = now_ms as f32 / 4000.0;

    // planet pass
    match sel.phase() {
        SelectorPhase::Browsing => {
            if let Some(pet) = sel.pets().get(sel.cursor()) {
                let planet = Placement {
                    cx: w / 2.0,
                    cy: h * 0.38,
                    radius,
                    rotation: spin,
                    tilt: 0.25,
                    opacity: 1.0,
                };
                draw_planet(&mut term.canvas, &pet.image, planet);
            }
        }
        SelectorPhase::AnimatingSelection {
            pet,
            slide_out_at,
            narrate_at,
            ..
        } => {
            if let Some(pet) = sel.pets().get(pet) {
                let out = progress(slide_out_at, narrate_at - slide_out_at, now_ms);
                let planet = Placement {
                    cx: w / 2.0,
                    cy: h * 0.45 - out * h,
                    radius: radius * 1.1,
                    rotation: spin,
                    tilt: 0.25,
                    opacity: 1.0 - out,
                };
                draw_planet(&mut term.canvas, &pet.image, planet);
            }
        }
        SelectorPhase::Narrating { .. } | SelectorPhase::Done { .. } => {}
    }
    canvas_to_cells(&term.canvas, &mut term.cur, enable_color, palette);

    // text pass
    let buf = &mut term.cur;
    match sel.phase() {
        SelectorPhase::Browsing => {
            let Some(pet) = sel.pets().get(sel.cursor()) else {
                draw_centered(buf, rows / 2, "No planets to adopt.", palette.fg, palette.bg);
                return;
            };
            draw_centered(buf, 1, "Choose a planet to look after", palette.dim, palette.bg);
            let dots: String = (0..sel.pets().len())
                .map(|i| if i == sel.cursor() { '●' } else { '○' })
                .collect();
            draw_centered(buf, 2, &dots, palette.dim, palette.bg);

            let y = ((h * 0.38 + radius * 1.3) / 4.0) as u16 + 1;
            draw_centered(buf, y, &pet.name, palette.highlight, palette.bg);
            let width = (cols as usize).min(60).saturating_sub(4);
            for (i, line) in wrap_text(&pet.description, width).iter().enumerate() {
                draw_centered(buf, y + 2 + i as u16, line, palette.fg, palette.bg);
            }
            draw_centered(
                buf,
                rows.saturating_sub(1),
                "←/→ browse | enter adopt | t theme | q quit",
                palette.dim,
                palette.bg,
            );
        }
        SelectorPhase::AnimatingSelection { pet, slide_out_at, .. } if now_ms < slide_out_at => {
            if let Some(pet) = sel.pets().get(pet) {
                let y = ((h * 0.45 + radius * 1.5) / 4.0) as u16 + 1;
                let label = format!("{} adopted", pet.name);
                draw_centered(buf, y, &label, palette.highlight, palette.bg);
            }
        }
        SelectorPhase::Narrating { .. } => {
            if let Some(line) = sel.current_line() {
                let lines = wrap_text(line, (cols as usize).min(70).saturating_sub(6));
                let top = (rows / 2).saturating_sub(lines.len() as u16 / 2);
                for (i, l) in lines.iter().enumerate() {
                    draw_centered(buf, top + i as u16, l, palette.fg, palette.bg);
                }
            }
        }
        _ => {}
    }
}

/// Vitals panel on the left, the pet on the right.
pub(crate) fn draw_game(
    term: &mut Terminal,
    game: &GameView,
    palette: &Palette,
    enable_color: bool,
    now_ms: u64,
) {
    let (cols, rows) = (term.cols, term.rows);
    let panel_w = (cols / 3).clamp(30.min(cols), 44).min(cols);
    let (fg, bg, dim) = (palette.fg, palette.bg, palette.dim);

    let view_w = (cols - panel_w) as f32 * 2.0;
    let view_h = rows as f32 * 4.0;
    let planet = Placement {
        cx: panel_w as f32 * 2.0 + view_w / 2.0,
        cy: view_h / 2.0,
        radius: (view_h * 0.32).min(view_w * 0.3),
        rotation: now_ms as f32 / 5000.0,
        tilt: 0.3,
        opacity: game.fade_opacity(now_ms),
    };
    draw_planet(&mut term.canvas, &game.pet().image, planet);
    canvas_to_cells(&term.canvas, &mut term.cur, enable_color, palette);

    let buf = &mut term.cur;
    draw_text(buf, 1, 0, &game.pet().name, palette.highlight, bg);
    let score = format!("Score {}  |  Best {}", game.score(), game.high_score());
    draw_text(buf, 1, 1, &score, dim, bg);

    let bar_w = (panel_w as usize).saturating_sub(20).clamp(6, 20);
    for (i, kind) in VitalKind::ALL.into_iter().enumerate() {
        let vital = game.stats().get(kind);
        let color = severity_color(game.severity(kind), palette);
        let line = format!(
            "{:<9} {} {:>4.0}",
            kind.label(),
            bar(vital.display_percent() / 100.0, bar_w),
            vital.value
        );
        let y = 3 + i as u16 * 2;
        draw_text(buf, 1, y, &line, color, bg);

        let (control, control_fg) = match game.countdown_secs(kind, now_ms) {
            Some(secs) => (format!("  [{}] {} ({secs}s)", kind.key(), kind.action_label()), dim),
            None => (format!("  [{}] {}", kind.key(), kind.action_label()), fg),
        };
        draw_text(buf, 1, y + 1, &control, control_fg, bg);
    }

    let log_top = 10u16;
    let footer = rows.saturating_sub(1);
    let room = footer.saturating_sub(log_top + 1) as usize;
    let width = (panel_w as usize).saturating_sub(2);
    let mut lines: Vec<(String, Color)> = Vec::new();
    for entry in game.log().rev() {
        if lines.len() >= room {
            break;
        }
        let color = level_color(entry.level, palette);
        let text = format!("{} {}", clock_label(entry.at_ms), entry.message);
        for l in wrap_text(&text, width).into_iter().rev() {
            lines.push((l, color));
        }
    }
    lines.truncate(room);
    draw_text(buf, 1, log_top, "Log", dim, bg);
    for (i, (l, color)) in lines.iter().rev().enumerate() {
        draw_text(buf, 1, log_top + 1 + i as u16, l, *color, bg);
    }

    draw_text(buf, 1, footer, "1/2/3 act | t theme | q quit", dim, bg);

    if let Phase::GameOver { restart_at } = game.phase() {
        let secs = restart_at.saturating_sub(now_ms).div_ceil(1000);
        let bw = 40.min(cols.saturating_sub(2));
        let (x0, y0) = (cols.saturating_sub(bw) / 2, (rows / 2).saturating_sub(3));
        draw_box(buf, x0, y0, bw, 6, fg, bg);
        draw_centered(buf, y0 + 2, &format!("{} is gone.", game.pet().name), palette.highlight, bg);
        draw_centered(buf, y0 + 3, &format!("A new search begins in {secs}s"), fg, bg);
    }
}
