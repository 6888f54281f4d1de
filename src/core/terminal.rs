use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

/// How a console line is decorated. Errors go to stderr, everything else to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Success,
    Info,
    Warn,
    Error,
}

fn say(tone: Tone, msg: &str) {
    let styled = match tone {
        Tone::Success => style(msg).green(),
        Tone::Info => style(msg).blue(),
        Tone::Warn => style(msg).yellow(),
        Tone::Error => style(msg).red().bold(),
    };
    let icon = match tone {
        Tone::Success => &SUCCESS_ICON,
        Tone::Info => &INFO_ICON,
        Tone::Warn => &WARN_ICON,
        Tone::Error => &ERROR_ICON,
    };
    if tone == Tone::Error {
        eprintln!("{} {}", icon, styled);
    } else {
        println!("{} {}", icon, styled);
    }
}

pub fn print_success(msg: &str) {
    say(Tone::Success, msg);
}

pub fn print_info(msg: &str) {
    say(Tone::Info, msg);
}

pub fn print_warn(msg: &str) {
    say(Tone::Warn, msg);
}

pub fn print_error(msg: &str) {
    say(Tone::Error, msg);
}

/// `label: value` row used by `doctor` for facts that are neither good nor bad.
pub fn print_status(label: &str, value: &str) {
    println!("  {} {:<20} {}", GEAR, style(format!("{}:", label)).cyan(), value);
}

/// Section heading.
pub fn print_step(title: &str) {
    println!("{} {}", SPARKLE, style(title).bold().underlined());
}

/// Titled block of `command  description` rows for the help screen.
pub struct GuideSection {
    title: String,
    rows: Vec<(String, String)>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, description: &str) -> Self {
        self.rows.push((name.to_string(), description.to_string()));
        self
    }

    pub fn print(&self) {
        println!("\n {}", style(&self.title).bold().underlined());
        let width = self.rows.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (name, description) in &self.rows {
            println!(
                "   {}  {}",
                style(format!("{:<width$}", name, width = width)).green(),
                style(description).dim()
            );
        }
    }
}

pub fn print_banner() {
    let title = "mizkeeper";

    // Gradient: #f59e0b → #ef4444 → #8b5cf6 (left → right)
    let stops: [(u8, u8, u8); 3] = [(245, 158, 11), (239, 68, 68), (139, 92, 246)];
    let max_d = title.len() as u32 - 1;

    println!();
    print!(" ");
    for (x, ch) in title.chars().enumerate() {
        let d = (x as u32 * 1000 / max_d).min(1000);
        let (r, g, b) = if d <= 500 {
            lerp_color(stops[0], stops[1], d * 2)
        } else {
            lerp_color(stops[1], stops[2], (d - 500) * 2)
        };
        print!("\x1b[1;38;2;{};{};{}m{}", r, g, b, ch);
    }
    println!("\x1b[0m");
    println!(" \x1b[38;2;139;92;246mMission time and weather that outlive a restart.\x1b[0m");
}

/// Blend two colours; `t` runs from 0 (all `from`) to 1000 (all `to`).
fn lerp_color(from: (u8, u8, u8), to: (u8, u8, u8), t: u32) -> (u8, u8, u8) {
    let t = t.min(1000);
    let mix = |a: u8, b: u8| ((u32::from(a) * (1000 - t) + u32::from(b) * t) / 1000) as u8;
    (mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}
