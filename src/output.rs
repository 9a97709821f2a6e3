//! User-facing console lines, separate from tracing output.
//! Colors are enabled only when stdout is a TTY.

use owo_colors::{OwoColorize, Style};

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

fn line(label: &str, style: Style, msg: &str) -> String {
    if is_tty() {
        format!("{} {}", label.style(style), msg)
    } else {
        format!("{label} {msg}")
    }
}

pub fn print_info(msg: &str) {
    println!("{}", line("info:", Style::new().cyan().bold(), msg));
}

pub fn print_warn(msg: &str) {
    eprintln!("{}", line("warn:", Style::new().yellow().bold(), msg));
}

pub fn print_error(msg: &str) {
    eprintln!("{}", line("error:", Style::new().red().bold(), msg));
}

pub fn print_success(msg: &str) {
    println!("{}", line("ok:", Style::new().green().bold(), msg));
}

/// One dry-run plan line: `[<namespace>] <step>`. Scripts may parse these.
pub fn print_step(namespace: &str, step: &str) {
    println!("{}", line(&format!("[{namespace}]"), Style::new().bold(), step));
}
