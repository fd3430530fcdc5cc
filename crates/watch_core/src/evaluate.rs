use crate::{JobStatus, WatchJob};

const FOUND_PREVIEW_CHARS: usize = 50;
const CHANGE_PREVIEW_CHARS: usize = 30;
const ELLIPSIS: &str = "...";
const ABSENT: &str = "(none)";

/// Verdict for one successful fetch of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub status: JobStatus,
    pub content: Option<String>,
    pub message: String,
    pub should_fire: bool,
}

/// Compares freshly fetched fragments with the job's remembered content.
///
/// Only the first fragment counts; no fragments means "no content". A job
/// without remembered content only records a baseline and never fires.
pub fn evaluate(job: &WatchJob, fragments: &[String]) -> Evaluation {
    let current = fragments.first().cloned();
    let found = format!(
        "Found content: \"{}\"",
        preview(current.as_deref(), FOUND_PREVIEW_CHARS)
    );

    let Some(previous) = job.last_content.as_deref() else {
        return Evaluation {
            status: JobStatus::Monitoring,
            content: current,
            message: found,
            should_fire: false,
        };
    };

    if current.as_deref() == Some(previous) {
        return Evaluation {
            status: JobStatus::Monitoring,
            content: current,
            message: found,
            should_fire: false,
        };
    }

    let mut message = format!(
        "Content changed from \"{}\" to \"{}\"",
        preview(Some(previous), CHANGE_PREVIEW_CHARS),
        preview(current.as_deref(), CHANGE_PREVIEW_CHARS)
    );
    let should_fire = trigger_matches(job.trigger_value.as_deref(), current.as_deref());
    let status = if should_fire {
        message.push_str(". Trigger condition met, dispatching webhook.");
        JobStatus::Triggered
    } else {
        message.push_str(". Trigger condition not met.");
        JobStatus::Monitoring
    };

    Evaluation {
        status,
        content: current,
        message,
        should_fire,
    }
}

/// An empty trigger matches any change; otherwise content must equal it exactly.
pub fn trigger_matches(trigger: Option<&str>, current: Option<&str>) -> bool {
    match trigger {
        None | Some("") => true,
        Some(expected) => current == Some(expected),
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut.
pub fn preview(text: Option<&str>, max_chars: usize) -> String {
    let Some(text) = text else {
        return ABSENT.to_string();
    };
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}{ELLIPSIS}", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{preview, trigger_matches};

    #[test]
    fn short_content_kept_as_is() {
        assert_eq!(preview(Some("short"), 10), "short");
        assert_eq!(preview(Some("exactly10!"), 10), "exactly10!");
    }

    #[test]
    fn long_content_is_cut_on_char_boundary() {
        let text = "åäö".repeat(10);
        let cut = preview(Some(&text), 4);
        assert_eq!(cut, "åäöå...");
    }

    #[test]
    fn absent_content_has_placeholder() {
        assert_eq!(preview(None, 10), "(none)");
    }

    #[test]
    fn empty_trigger_matches_anything() {
        assert!(trigger_matches(None, None));
        assert!(trigger_matches(Some(""), Some("x")));
        assert!(trigger_matches(Some(""), None));
    }

    #[test]
    fn absent_content_never_matches_non_empty_trigger() {
        assert!(!trigger_matches(Some("Sold out"), None));
        assert!(!trigger_matches(Some("Sold out"), Some("sold out")));
        assert!(trigger_matches(Some("Sold out"), Some("Sold out")));
    }
}
