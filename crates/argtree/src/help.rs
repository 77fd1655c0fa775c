//! Help text rendering for commands.

use crate::command::Command;
use crate::flag::Flag;

/// Narrowest column used for `--name type`.
const MIN_NAME_WIDTH: usize = 12;

struct FlagRow {
    short: String,
    long: String,
    help: String,
}

fn flag_row(flag: &dyn Flag) -> FlagRow {
    let short = flag
        .shorthand()
        .map(|c| format!("-{c}, "))
        .unwrap_or_default();
    let long = format!("--{} {}", flag.name(), flag.type_tag());

    let mut help = flag.usage_text().to_string();
    if let Some(default) = flag.default_as_string() {
        push_note(&mut help, &format!("(default: {default})"));
    }
    if let Some(allowed) = flag.allowed_values_as_string() {
        push_note(&mut help, &format!("(allowed: {allowed})"));
    }

    FlagRow { short, long, help }
}

fn push_note(out: &mut String, note: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(note);
}

fn help_row<U, T>(cmd: &Command<U, T>) -> Option<FlagRow> {
    if cmd.flags().find("help").is_some() {
        return None;
    }
    let short = if cmd.flags().find_short('h').is_some() {
        String::new()
    } else {
        "-h, ".to_string()
    };
    Some(FlagRow {
        short,
        long: "--help".to_string(),
        help: format!("help for {}", cmd.name()),
    })
}

pub(crate) fn render<U, T>(cmd: &Command<U, T>, preamble: bool) -> String {
    let mut out = String::new();

    if preamble && !cmd.usage_long().is_empty() {
        out.push_str(cmd.usage_long());
        out.push_str("\n\n");
    }

    let path = cmd.path_segments().join(" ");
    out.push_str("Usage:\n");
    out.push_str(&format!("  {path} [flags]\n"));

    let children = cmd.children();
    if !children.is_empty() {
        out.push_str(&format!("  {path} [command]\n"));
        out.push_str("\nAvailable Commands:\n");
        let width = children.iter().map(|c| c.name().len()).max().unwrap_or(0);
        for child in &children {
            let line = format!("  {:width$}   {}", child.name(), child.usage(), width = width);
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    let mut rows: Vec<FlagRow> = help_row(cmd).into_iter().collect();
    rows.extend(cmd.flags().iter().map(|f| flag_row(f.as_ref())));
    rows.sort_by(|a, b| a.long.cmp(&b.long));

    let short_width = rows.iter().map(|r| r.short.len()).max().unwrap_or(0);
    let long_width = rows
        .iter()
        .map(|r| r.long.len())
        .max()
        .unwrap_or(0)
        .max(MIN_NAME_WIDTH);

    out.push_str("\nFlags:\n");
    for row in rows {
        let line = format!(
            "  {:sw$}{:lw$}   {}",
            row.short,
            row.long,
            row.help,
            sw = short_width,
            lw = long_width
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::command::Command;
    use crate::flag::{BoolFlag, StringArrayFlag, StringFlag, UintFlag};

    fn sample() -> Arc<Command> {
        let root = Command::builder("app")
            .usage("demo application")
            .usage_long("App does things.\nMany things.")
            .prepare(|flags| {
                flags.add(
                    UintFlag::new("port")
                        .short('p')
                        .usage("port to listen on")
                        .default(8080)
                        .allowed([80, 8080]),
                )?;
                flags.add(BoolFlag::new("verbose").usage("chatty output"))?;
                flags.add(StringArrayFlag::new("tag").short('t'))?;
                Ok(None)
            })
            .build()
            .unwrap();
        root.add_new(Command::builder("serve").usage("start the server"))
            .unwrap();
        root.add_new(Command::builder("build").usage("build it")).unwrap();
        root
    }

    #[test]
    fn full_help_layout() {
        let text = sample().help();
        let expected = "\
App does things.
Many things.

Usage:
  app [flags]
  app [command]

Available Commands:
  build   build it
  serve   start the server

Flags:
  -h, --help           help for app
  -p, --port uint      port to listen on (default: 8080) (allowed: 80, 8080)
  -t, --tag string[]
      --verbose bool   chatty output
";
        assert_eq!(text, expected);
    }

    #[test]
    fn usage_block_skips_preamble_and_shows_path() {
        let root = sample();
        let serve = root.child("serve").unwrap();
        let text = serve.usage_block();
        assert!(text.starts_with("Usage:\n  app serve [flags]\n"));
        assert!(!text.contains("[command]"));
        assert!(text.contains("  -h, --help         help for serve\n"));
    }

    #[test]
    fn declared_help_flag_replaces_implicit_entry() {
        let cmd: Arc<Command> = Command::builder("tool")
            .prepare(|flags| {
                flags.add(StringFlag::new("host").short('h'))?;
                Ok(None)
            })
            .build()
            .unwrap();
        let text = cmd.help();
        assert!(text.contains("      --help"));
        assert!(text.contains("  -h, --host string"));
    }
}
