//! Terminal output for the takebin binaries: clap colours, status lines,
//! section frames and tables.

use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

const FRAME_WIDTH: usize = 60;

pub fn get_styles() -> Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
    let good = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Green)));
    let bad = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(good)
        .valid(good)
        .invalid(bad)
        .error(bad)
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

pub mod colors {
    use crossterm::style::Color;

    pub const CYAN: Color = Color::Rgb { r: 0, g: 255, b: 255 };
    pub const MAGENTA: Color = Color::Rgb { r: 255, g: 0, b: 255 };
    pub const PURPLE: Color = Color::Rgb { r: 180, g: 100, b: 255 };
    pub const GREEN: Color = Color::Rgb { r: 0, g: 255, b: 136 };
    pub const ORANGE: Color = Color::Rgb { r: 255, g: 165, b: 0 };
    pub const RED: Color = Color::Rgb { r: 255, g: 85, b: 85 };
    pub const BLUE: Color = Color::Rgb { r: 100, g: 149, b: 237 };
    pub const DIM: Color = Color::Rgb { r: 128, g: 128, b: 128 };
    pub const WHITE: Color = Color::Rgb { r: 255, g: 255, b: 255 };
}

pub mod box_chars {
    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";

    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";

    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";

    pub const ARROW_RIGHT: &str = "▶";
    pub const BULLET: &str = "●";
    pub const BULLET_EMPTY: &str = "○";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

pub fn print_banner() {
    let banner = r#"
    ████████╗ █████╗ ██╗  ██╗███████╗██████╗ ██╗███╗   ██╗
    ╚══██╔══╝██╔══██╗██║ ██╔╝██╔════╝██╔══██╗██║████╗  ██║
       ██║   ███████║█████╔╝ █████╗  ██████╔╝██║██╔██╗ ██║
       ██║   ██╔══██║██╔═██╗ ██╔══╝  ██╔══██╗██║██║╚██╗██║
       ██║   ██║  ██║██║  ██╗███████╗██████╔╝██║██║ ╚████║
       ╚═╝   ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝╚═════╝ ╚═╝╚═╝  ╚═══╝
"#;

    let gradient = [
        colors::CYAN,
        colors::CYAN,
        colors::PURPLE,
        colors::PURPLE,
        colors::MAGENTA,
        colors::MAGENTA,
        colors::MAGENTA,
    ];
    for (i, line) in banner.lines().enumerate() {
        let color = gradient.get(i).copied().unwrap_or(colors::CYAN);
        println!("{}", line.with(color).bold());
    }
    println!(
        "{}",
        "  ══════════════════  TAKE CATALOG SHELL  ══════════════════".with(colors::DIM)
    );
    println!();
}

fn print_status(symbol: &str, color: CtColor, message: &str) {
    println!(" {} {}", symbol.with(color).bold(), message.with(color));
}

pub fn print_success(message: &str) {
    print_status(box_chars::CHECK, colors::GREEN, message);
}

pub fn print_error(message: &str) {
    print_status(box_chars::CROSS_MARK, colors::RED, message);
}

pub fn print_warning(message: &str) {
    print_status("⚠", colors::ORANGE, message);
}

pub fn print_info(message: &str) {
    print_status("ℹ", colors::BLUE, message);
}

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let left = FRAME_WIDTH.saturating_sub(title_len + 4) / 2;
    let right = FRAME_WIDTH.saturating_sub(title_len + 4 + left);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::ROUND_TOP_LEFT.with(colors::CYAN),
        box_chars::HORIZONTAL.repeat(left).with(colors::CYAN),
        title.with(colors::CYAN).bold().attribute(Attribute::Italic),
        box_chars::HORIZONTAL.repeat(right).with(colors::CYAN),
        box_chars::ROUND_TOP_RIGHT.with(colors::CYAN),
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        box_chars::ROUND_BOTTOM_LEFT.with(colors::CYAN),
        box_chars::HORIZONTAL.repeat(FRAME_WIDTH).with(colors::CYAN),
        box_chars::ROUND_BOTTOM_RIGHT.with(colors::CYAN),
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::PURPLE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_list_item(item: &str, indent: usize) {
    println!(
        "{}{}  {}",
        "  ".repeat(indent),
        box_chars::ARROW_RIGHT.with(colors::CYAN),
        item.with(colors::WHITE)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        box_chars::BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

/// Box-drawn table sized to its widest cells.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        TableBuilder {
            col_widths: headers.iter().map(|h| h.width()).collect(),
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (width, cell) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn print_border(&self, left: &str, junction: &str, right: &str) {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|w| box_chars::HORIZONTAL.repeat(w + 2))
            .collect();
        println!(
            "{}{}{}",
            left.with(colors::CYAN),
            segments.join(junction).with(colors::CYAN),
            right.with(colors::CYAN)
        );
    }

    fn print_cells(&self, cells: &[String], header: bool) {
        print!("{}", box_chars::VERTICAL.with(colors::CYAN));
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = " ".repeat(width.saturating_sub(cell.width()));
            if header {
                print!(" {}{} ", cell.with(colors::CYAN).bold(), padding);
            } else {
                print!(" {}{} ", cell.with(colors::WHITE), padding);
            }
            print!("{}", box_chars::VERTICAL.with(colors::CYAN));
        }
        println!();
    }

    pub fn print(&self) {
        self.print_border(box_chars::ROUND_TOP_LEFT, box_chars::T_TOP, box_chars::ROUND_TOP_RIGHT);
        self.print_cells(&self.headers, true);
        self.print_border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);
        for row in &self.rows {
            self.print_cells(row, false);
        }
        self.print_border(
            box_chars::ROUND_BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::ROUND_BOTTOM_RIGHT,
        );
    }
}

pub fn get_prompt() -> String {
    format!(
        "{}{}{} ",
        "❯".with(colors::CYAN).bold(),
        "❯".with(colors::PURPLE).bold(),
        "❯".with(colors::MAGENTA).bold(),
    )
}

pub fn print_command_echo(command: &str) {
    println!("{} {}", get_prompt(), command.with(colors::GREEN).bold());
}

pub fn print_welcome(project_root: &str) {
    print_banner();
    print_section_header("Project");
    print_key_value("Path", project_root);
    print_key_value("Version", env!("GIT_HASH"));
    print_section_footer();
    print_empty_list("Type 'help' for available commands");
    println!();
}

pub fn print_goodbye() {
    println!();
    println!("  {}", "Bye.".with(colors::PURPLE).bold());
    println!();
}

pub fn flush() {
    let _ = io::stdout().flush();
}
