//! Line-oriented operator console on stdin.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use watch_core::{preview, JobId, JobSubmission, SelectorKind, WatchJob};
use watch_engine::{ContentFetcher, ReqwestContentFetcher, Scheduler};
use watch_logging::watch_debug;

/// Characters of page source shown by `html`.
const HTML_EXCERPT_CHARS: usize = 2000;

pub const USAGE: &str = "commands:
  add <url> <class|id|tag> <selector> <endpoint> [trigger text...]
  remove <id>
  list
  tick
  html <url>
  select <url> <class|id|tag> <selector>
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(JobSubmission),
    Remove(JobId),
    List,
    Tick,
    /// One-shot page download, printed as source.
    Html(String),
    /// One-shot fragment lookup without creating a job.
    Select {
        url: String,
        selector_kind: SelectorKind,
        selector_value: String,
    },
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };
    match verb.to_ascii_lowercase().as_str() {
        "add" => {
            let args: Vec<&str> = words.collect();
            if args.len() < 4 {
                return Err("add needs <url> <kind> <selector> <endpoint>".to_string());
            }
            let selector_kind = parse_kind(args[1])?;
            let trigger = args[4..].join(" ");
            Ok(Command::Add(JobSubmission {
                url: args[0].to_string(),
                selector_kind,
                selector_value: args[2].to_string(),
                trigger_value: (!trigger.is_empty()).then_some(trigger),
                target_endpoint: args[3].to_string(),
            }))
        }
        "remove" | "rm" => {
            let id = words
                .next()
                .ok_or_else(|| "remove needs a job id".to_string())?;
            id.parse()
                .map(Command::Remove)
                .map_err(|_| format!("'{id}' is not a job id"))
        }
        "list" | "ls" => Ok(Command::List),
        "tick" => Ok(Command::Tick),
        "html" => {
            let url = words.next().ok_or_else(|| "html needs a <url>".to_string())?;
            Ok(Command::Html(url.to_string()))
        }
        "select" => {
            let args: Vec<&str> = words.collect();
            if args.len() != 3 {
                return Err("select needs <url> <kind> <selector>".to_string());
            }
            Ok(Command::Select {
                url: args[0].to_string(),
                selector_kind: parse_kind(args[1])?,
                selector_value: args[2].to_string(),
            })
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}'")),
    }
}

fn parse_kind(raw: &str) -> Result<SelectorKind, String> {
    match raw.to_ascii_lowercase().as_str() {
        "class" | "classname" => Ok(SelectorKind::ClassName),
        "id" => Ok(SelectorKind::Id),
        "tag" | "tagname" => Ok(SelectorKind::TagName),
        other => Err(format!("unknown selector kind '{other}' (class, id or tag)")),
    }
}

/// One `list` line for a job.
pub fn render_job(job: &WatchJob) -> String {
    let checked = job
        .last_checked_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "#{} [{}] {} ({}) checked {} - {}",
        job.id,
        job.status,
        job.url,
        job.selector_description(),
        checked,
        job.message.as_deref().unwrap_or("")
    )
}

/// Output of `select`: every fragment numbered, then the count.
pub fn render_fragments(fragments: &[String]) -> String {
    let mut out = String::new();
    for (index, fragment) in fragments.iter().enumerate() {
        out.push_str(&format!("[{}] {}\n", index + 1, fragment));
    }
    out.push_str(&format!("{} element(s) found", fragments.len()));
    out
}

/// Reads commands until `quit`, end of input, or shutdown.
pub async fn run_console(
    scheduler: Scheduler,
    fetcher: Arc<ReqwestContentFetcher>,
    shutdown: CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                watch_debug!("Console input closed");
                return;
            }
            Err(err) => {
                eprintln!("console read failed: {err}");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Add(submission)) => match scheduler.submit(submission) {
                Ok(id) => println!("added job #{id}"),
                Err(err) => println!("rejected: {err}"),
            },
            Ok(Command::Remove(id)) => {
                if scheduler.remove(id) {
                    println!("removed job #{id}");
                } else {
                    println!("no job #{id}");
                }
            }
            Ok(Command::List) => {
                let jobs = scheduler.jobs();
                if jobs.is_empty() {
                    println!("no jobs");
                }
                for job in &jobs {
                    println!("{}", render_job(job));
                }
            }
            Ok(Command::Tick) => scheduler.request_tick(),
            Ok(Command::Html(url)) => match fetcher.fetch_html(&url).await {
                Ok(html) => println!("{}", preview(Some(&html), HTML_EXCERPT_CHARS)),
                Err(err) => println!("fetch failed: {err}"),
            },
            Ok(Command::Select {
                url,
                selector_kind,
                selector_value,
            }) => {
                let selector = selector_kind.render(&selector_value);
                match fetcher.fetch(&url, &selector).await {
                    Ok(fragments) => println!("{}", render_fragments(&fragments)),
                    Err(err) => println!("select failed: {err}"),
                }
            }
            Ok(Command::Help) => println!("{USAGE}"),
            Ok(Command::Quit) => {
                shutdown.cancel();
                return;
            }
            Err(err) => println!("{err}\n{USAGE}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use watch_core::{JobSubmission, SelectorKind};

    use super::{parse_command, render_fragments, Command};

    #[test]
    fn add_joins_trailing_words_into_trigger() {
        let command =
            parse_command("add shop.example.com id stock https://hooks.example.com Sold out")
                .unwrap();
        assert_eq!(
            command,
            Command::Add(JobSubmission {
                url: "shop.example.com".to_string(),
                selector_kind: SelectorKind::Id,
                selector_value: "stock".to_string(),
                trigger_value: Some("Sold out".to_string()),
                target_endpoint: "https://hooks.example.com".to_string(),
            })
        );
    }

    #[test]
    fn add_without_trigger_fires_on_any_change() {
        let Command::Add(submission) =
            parse_command("add example.com class headline https://hooks.example.com").unwrap()
        else {
            panic!("expected add");
        };
        assert_eq!(submission.trigger_value, None);
        assert_eq!(submission.selector_kind, SelectorKind::ClassName);
    }

    #[test]
    fn malformed_commands_are_errors() {
        assert!(parse_command("add example.com class").is_err());
        assert!(parse_command("add a.com xpath x https://h").is_err());
        assert!(parse_command("remove").is_err());
        assert!(parse_command("remove seven").is_err());
        assert!(parse_command("launch").is_err());
    }

    #[test]
    fn simple_commands_parse() {
        assert_eq!(parse_command("remove 3"), Ok(Command::Remove(3)));
        assert_eq!(parse_command("LIST"), Ok(Command::List));
        assert_eq!(parse_command("tick"), Ok(Command::Tick));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
    }

    #[test]
    fn select_parses_a_one_shot_lookup() {
        assert_eq!(
            parse_command("select example.com tag h1"),
            Ok(Command::Select {
                url: "example.com".to_string(),
                selector_kind: SelectorKind::TagName,
                selector_value: "h1".to_string(),
            })
        );
        assert!(parse_command("select example.com tag").is_err());
        assert!(parse_command("select example.com tag h1 extra").is_err());
        assert!(parse_command("select example.com xpath h1").is_err());
    }

    #[test]
    fn html_needs_a_url() {
        assert_eq!(
            parse_command("html example.com"),
            Ok(Command::Html("example.com".to_string()))
        );
        assert!(parse_command("html").is_err());
    }

    #[test]
    fn fragments_are_numbered_and_counted() {
        let fragments = vec!["Open".to_string(), "Closed".to_string()];
        assert_eq!(
            render_fragments(&fragments),
            "[1] Open\n[2] Closed\n2 element(s) found"
        );
        assert_eq!(render_fragments(&[]), "0 element(s) found");
    }
}
