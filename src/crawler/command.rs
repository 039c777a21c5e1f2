//! External extractor process adapter
//!
//! Drives a browser-automation script as a child process. The script receives
//! `--query <raw> --start <position> --url <search url>` after the configured
//! arguments and writes one JSON event per line on stdout:
//!
//! ```text
//! {"event":"total","count":57}
//! {"event":"item","name":"...","phone":"...","address":"...","website":"...","hours":"..."}
//! {"event":"skip"}
//! {"event":"end"}
//! {"event":"error","message":"..."}
//! ```

use crate::config::ExtractorConfig;
use crate::crawler::source::{ExtractError, Extraction, ItemSource};
use crate::query::ResolvedQuery;
use crate::state::CrawlItem;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use url::Url;

/// One line of extractor output
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ExtractorEvent {
    Total { count: u64 },
    Item(CrawlItem),
    Skip,
    End,
    Error { message: String },
}

/// Builds the map-search URL for a query
///
/// The query becomes a single percent-encoded path segment under `base`.
///
/// # Examples
///
/// ```
/// use mapsweep::crawler::build_search_url;
///
/// let url = build_search_url("https://www.google.com/maps/search/", "spa ha noi").unwrap();
/// assert_eq!(url.as_str(), "https://www.google.com/maps/search/spa%20ha%20noi");
/// ```
pub fn build_search_url(base: &str, raw_query: &str) -> Result<Url, ExtractError> {
    let mut url = Url::parse(base).map_err(|e| ExtractError::InvalidUrl(e.to_string()))?;

    url.path_segments_mut()
        .map_err(|_| ExtractError::InvalidUrl(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .push(raw_query.trim());

    Ok(url)
}

/// Item source backed by an external extractor process
pub struct CommandSource {
    config: ExtractorConfig,
    child: Option<Child>,
    lines: Option<Lines<BufReader<ChildStdout>>>,
    line_no: usize,
    total: Option<u64>,
    finished: bool,
}

impl CommandSource {
    /// Creates a source that will launch `config.command` on `start`
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            child: None,
            lines: None,
            line_no: 0,
            total: None,
            finished: false,
        }
    }

    /// Handles end of stdout: a clean exit means the result list is exhausted
    async fn finish(&mut self) -> Result<Extraction, ExtractError> {
        self.finished = true;
        self.lines = None;

        if let Some(mut child) = self.child.take() {
            let status = child.wait().await?;
            if !status.success() {
                return Err(ExtractError::Exited(status.to_string()));
            }
        }

        Ok(Extraction::Exhausted)
    }
}

#[async_trait]
impl ItemSource for CommandSource {
    async fn start(
        &mut self,
        query: &ResolvedQuery,
        from_position: u64,
    ) -> Result<(), ExtractError> {
        let url = build_search_url(&self.config.search_url, &query.raw)?;

        tracing::debug!(
            "Launching extractor {} for '{}' from position {}",
            self.config.command,
            query.raw,
            from_position
        );

        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg("--query")
            .arg(&query.raw)
            .arg("--start")
            .arg(from_position.to_string())
            .arg("--url")
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExtractError::Launch)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::Exited("stdout was not captured".to_string()))?;

        self.lines = Some(BufReader::new(stdout).lines());
        self.child = Some(child);
        self.line_no = 0;
        self.total = None;
        self.finished = false;

        Ok(())
    }

    async fn next(&mut self) -> Result<Extraction, ExtractError> {
        loop {
            if self.finished {
                return Ok(Extraction::Exhausted);
            }

            let lines = self.lines.as_mut().ok_or(ExtractError::NotStarted)?;
            let Some(line) = lines.next_line().await? else {
                return self.finish().await;
            };
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event: ExtractorEvent =
                serde_json::from_str(line).map_err(|e| ExtractError::Protocol {
                    line: self.line_no,
                    message: e.to_string(),
                })?;

            match event {
                ExtractorEvent::Total { count } => self.total = Some(count),
                ExtractorEvent::Item(item) => return Ok(Extraction::Item(item)),
                ExtractorEvent::Skip => return Ok(Extraction::Rejected),
                ExtractorEvent::End => {
                    // The child is killed on drop if it lingers after signalling the end
                    self.finished = true;
                    self.lines = None;
                    self.child = None;
                    return Ok(Extraction::Exhausted);
                }
                ExtractorEvent::Error { message } => return Err(ExtractError::Reported(message)),
            }
        }
    }

    fn total_estimate(&self) -> Option<u64> {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_search_url_encodes_query() {
        let url = build_search_url("https://www.google.com/maps/search/", "nha khoa quận 1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.google.com/maps/search/nha%20khoa%20qu%E1%BA%ADn%201"
        );
    }

    #[test]
    fn test_build_search_url_without_trailing_slash() {
        let url = build_search_url("https://maps.example.com/search", "a/b").unwrap();
        assert_eq!(url.as_str(), "https://maps.example.com/search/a%2Fb");
    }

    #[test]
    fn test_build_search_url_rejects_garbage() {
        assert!(matches!(
            build_search_url("not a url", "spa"),
            Err(ExtractError::InvalidUrl(_))
        ));
        assert!(matches!(
            build_search_url("mailto:someone@example.com", "spa"),
            Err(ExtractError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_event_parsing() {
        let event: ExtractorEvent =
            serde_json::from_str(r#"{"event":"item","name":"Spa","website":"https://spa.vn"}"#)
                .unwrap();
        match event {
            ExtractorEvent::Item(item) => {
                assert_eq!(item.name.as_deref(), Some("Spa"));
                assert_eq!(item.website.as_deref(), Some("https://spa.vn"));
            }
            other => panic!("unexpected event {:?}", other),
        }

        let event: ExtractorEvent = serde_json::from_str(r#"{"event":"total","count":57}"#).unwrap();
        assert!(matches!(event, ExtractorEvent::Total { count: 57 }));
    }

    #[cfg(unix)]
    fn shell_source(script: &str) -> CommandSource {
        CommandSource::new(ExtractorConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            search_url: "https://maps.example.com/search/".to_string(),
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_source_streams_events() {
        let script = r#"
echo '{"event":"total","count":3}'
echo '{"event":"item","name":"A","phone":"0901234567"}'
echo ''
echo '{"event":"skip"}'
echo '{"event":"item","name":"B"}'
"#;
        let mut source = shell_source(script);
        let query = ResolvedQuery::new("spa ha noi").unwrap();
        source.start(&query, 0).await.unwrap();

        let first = source.next().await.unwrap();
        assert_eq!(
            first,
            Extraction::Item(CrawlItem {
                name: Some("A".to_string()),
                phone: Some("0901234567".to_string()),
                ..CrawlItem::default()
            })
        );
        assert_eq!(source.total_estimate(), Some(3));
        assert_eq!(source.next().await.unwrap(), Extraction::Rejected);
        assert_eq!(source.next().await.unwrap(), Extraction::Item(CrawlItem::named("B")));
        assert_eq!(source.next().await.unwrap(), Extraction::Exhausted);
        assert_eq!(source.next().await.unwrap(), Extraction::Exhausted);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_source_passes_query_and_position() {
        // sh -c places the appended arguments in $0..$5
        let script = r#"printf '{"event":"item","name":"%s@%s"}\n' "$1" "$3""#;
        let mut source = shell_source(script);
        let query = ResolvedQuery::new("spa").unwrap();
        source.start(&query, 30).await.unwrap();

        assert_eq!(
            source.next().await.unwrap(),
            Extraction::Item(CrawlItem::named("spa@30"))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_source_failure_exit() {
        let mut source = shell_source(r#"echo '{"event":"item","name":"A"}'; exit 3"#);
        let query = ResolvedQuery::new("spa").unwrap();
        source.start(&query, 0).await.unwrap();

        assert!(matches!(source.next().await.unwrap(), Extraction::Item(_)));
        assert!(matches!(source.next().await, Err(ExtractError::Exited(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_source_reported_error_and_garbage() {
        let mut source = shell_source(r#"echo '{"event":"error","message":"page timeout"}'"#);
        let query = ResolvedQuery::new("spa").unwrap();
        source.start(&query, 0).await.unwrap();
        match source.next().await {
            Err(ExtractError::Reported(message)) => assert_eq!(message, "page timeout"),
            other => panic!("unexpected {:?}", other),
        }

        let mut source = shell_source("echo 'definitely not json'");
        source.start(&query, 0).await.unwrap();
        assert!(matches!(
            source.next().await,
            Err(ExtractError::Protocol { line: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_next_before_start_fails() {
        let mut source = CommandSource::new(ExtractorConfig {
            command: "true".to_string(),
            args: vec![],
            search_url: "https://maps.example.com/".to_string(),
        });
        assert!(matches!(source.next().await, Err(ExtractError::NotStarted)));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_launch() {
        let mut source = CommandSource::new(ExtractorConfig {
            command: "/nonexistent/extractor-binary".to_string(),
            args: vec![],
            search_url: "https://maps.example.com/".to_string(),
        });
        let query = ResolvedQuery::new("spa").unwrap();
        assert!(matches!(
            source.start(&query, 0).await,
            Err(ExtractError::Launch(_))
        ));
    }
}
