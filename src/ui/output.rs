//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::{style, Emoji, Style};

static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
static WARN: Emoji<'_, '_> = Emoji("!", "[WARN]");
static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");
static INFO: Emoji<'_, '_> = Emoji("●", "[INFO]");

fn mark(ctx: &UiContext, emoji: &Emoji<'_, '_>) -> String {
    if ctx.use_fancy_output() {
        emoji.0.to_string()
    } else {
        emoji.1.to_string()
    }
}

/// Display a title banner
pub fn intro(_ctx: &UiContext, title: &str) {
    println!("{}", style(title).cyan().bold());
    println!();
}

/// Display a section header
pub fn section(_ctx: &UiContext, title: &str) {
    println!();
    println!("{}", style(title).bold());
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    println!("  {} {}", style(mark(ctx, &OK)).green(), message);
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    println!(
        "  {} {} ({})",
        style(mark(ctx, &OK)).green(),
        message,
        style(detail).dim()
    );
}

/// Display a warning step
pub fn step_warn(ctx: &UiContext, message: &str) {
    println!("  {} {}", style(mark(ctx, &WARN)).yellow(), message);
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    println!(
        "  {} {} - {}",
        style(mark(ctx, &WARN)).yellow(),
        message,
        style(hint).dim()
    );
}

/// Display an error step with detail
pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    println!(
        "  {} {}: {}",
        style(mark(ctx, &FAIL)).red(),
        message,
        style(detail).red()
    );
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    println!("  {} {}", style(mark(ctx, &INFO)).cyan(), message);
}

/// Display a remark/hint
pub fn remark(_ctx: &UiContext, message: &str) {
    println!("  {}", style(message).dim());
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print styled key-value with status color
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    let value_style = if ok {
        Style::new().green()
    } else {
        Style::new().yellow()
    };

    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value_style.apply_to(value));
    } else {
        let prefix = if ok { "[OK]" } else { "[WARN]" };
        println!("  {} {}: {}", prefix, key, value);
    }
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    println!();
    println!(
        "{} {}",
        style(mark(ctx, &OK)).green(),
        style(message).green().bold()
    );
}

/// Display warning outro
pub fn outro_warn(ctx: &UiContext, message: &str) {
    println!();
    println!(
        "{} {}",
        style(mark(ctx, &WARN)).yellow(),
        style(message).yellow().bold()
    );
}
