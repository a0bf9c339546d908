//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the `aria-bot` CLI.

use crate::types::HistoryEntry;
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Entries longer than this are shortened in `history show`
const PREVIEW_CHARS: usize = 120;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn preview(content: &str) -> String {
    let single_line = content.replace('\n', " ⏎ ");
    match single_line.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &single_line[..idx]),
        None => single_line,
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the Aria banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                r#"
   {}
   {}
   {}
   {}
"#,
                "    _         _       ".bright_magenta().bold(),
                "   / \\   _ __(_) __ _ ".magenta().bold(),
                "  / _ \\ | '__| |/ _` |".magenta().bold(),
                " /_/ \\_\\|_|  |_|\\__,_|".purple().bold(),
            );
            println!(
                "   {} {}\n",
                "Personal Telegram Assistant".bright_white().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!(
                r#"
    _         _
   / \   _ __(_) __ _
  / _ \ | '__| |/ _` |
 /_/ \_\|_|  |_|\__,_|

   Personal Telegram Assistant v{}
"#,
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a block of preformatted text, indented
    pub fn block(&self, text: &str) {
        for line in text.lines() {
            if self.colored {
                println!("    {}", line.dimmed());
            } else {
                println!("    {}", line);
            }
        }
    }

    /// Print one stored history entry
    pub fn history_entry(&self, position: usize, entry: &HistoryEntry) {
        let when = entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
        let content = preview(&entry.content);

        if self.colored {
            let role = match entry.role {
                crate::types::MessageRole::User => entry.role.as_str().cyan().bold().to_string(),
                crate::types::MessageRole::Assistant => {
                    entry.role.as_str().magenta().bold().to_string()
                }
            };
            println!(
                "    {} {} {:<9} {}",
                format!("{:>3}.", position).dimmed(),
                when.dimmed(),
                role,
                content
            );
        } else {
            println!(
                "    {:>3}. {} {:<9} {}",
                position,
                when,
                entry.role.as_str(),
                content
            );
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Prompt for confirmation (returns true if user confirms)
    pub fn confirm(&self, message: &str) -> bool {
        if self.colored {
            print!(
                "  {} {} [y/N]: ",
                "?".bright_yellow().bold(),
                message.bright_white()
            );
        } else {
            print!("  [?] {} [y/N]: ", message);
        }

        io::stdout().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_ok() {
            let input = input.trim().to_lowercase();
            input == "y" || input == "yes"
        } else {
            false
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}
