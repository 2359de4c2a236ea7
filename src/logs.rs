// src/logs.rs
// Log search dashboard: filter form, result table and prev/next pager.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::sync::Arc;

use crate::html::html_escape;
use crate::log_client::{LogEntry, LogPage, LogQuery, LogSearch, LogSearchError, DEFAULT_PAGE_SIZE};

/// Raw values of the filter form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilters {
    pub q: String,
    pub level: String,
    /// `datetime-local` input value, interpreted in local time.
    pub from: String,
    pub to: String,
}

impl LogFilters {
    pub fn to_query(&self, page: usize, size: usize) -> LogQuery {
        let q = self.q.trim();
        LogQuery {
            q: (!q.is_empty()).then(|| q.to_string()),
            level: (!self.level.is_empty()).then(|| self.level.clone()),
            from: parse_local_datetime(&self.from),
            to: parse_local_datetime(&self.to),
            page,
            size,
        }
    }
}

/// Accepts `datetime-local` values (`2024-05-01T08:30`, optionally with
/// seconds) as local time, or a full RFC 3339 timestamp.
pub fn parse_local_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok());
    match naive.and_then(|n| Local.from_local_datetime(&n).earliest()) {
        Some(local) => Some(local.with_timezone(&Utc)),
        None => {
            tracing::warn!(value = raw, "Ignoring unparseable date filter");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pager {
    pub page: usize,
    pub prev_disabled: bool,
    pub next_disabled: bool,
}

impl Pager {
    /// Next is off on a short page, and also once `total` is exhausted so a
    /// last page that exactly fills `size` doesn't offer an empty next page.
    pub fn for_page(page: usize, size: usize, hits: usize, total: u64) -> Self {
        let seen = (page as u64 + 1) * size as u64;
        Self {
            page,
            prev_disabled: page == 0,
            next_disabled: hits < size || seen >= total,
        }
    }

    pub fn to_html(&self) -> String {
        let disabled = |off: bool| if off { "disabled" } else { "" };
        format!(
            concat!(
                r##"<li class="page-item {}"><a class="page-link" href="#" id="btn-prev">Previous</a></li>"##,
                r##"<li class="page-item {}"><a class="page-link" href="#" id="btn-next">Next</a></li>"##
            ),
            disabled(self.prev_disabled),
            disabled(self.next_disabled)
        )
    }
}

/// Everything the dashboard shows after a load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTableView {
    pub total_text: String,
    pub rows_html: String,
    pub note: Option<String>,
    pub pager: Pager,
    pub pager_html: String,
}

fn format_timestamp(ts: Option<&str>) -> String {
    let Some(ts) = ts.filter(|t| !t.is_empty()) else {
        return String::new();
    };
    match DateTime::parse_from_rfc3339(ts) {
        Ok(parsed) => parsed
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => html_escape(ts),
    }
}

fn level_badge(level: Option<&str>) -> String {
    let level = level.unwrap_or("");
    let class = if level.is_empty() { "INFO" } else { level };
    format!(
        r#"<span class="badge badge-level badge-{}">{}</span>"#,
        html_escape(class),
        html_escape(level)
    )
}

pub fn render_row(entry: &LogEntry) -> String {
    let request = format!(
        "{} {} {}",
        entry.method.as_deref().unwrap_or(""),
        entry.path.as_deref().unwrap_or(""),
        entry.status_code.map(|s| s.to_string()).unwrap_or_default()
    );
    format!(
        r#"<tr class="log-row"><td>{}</td><td>{}</td><td><code>{}</code></td><td>{}</td></tr>"#,
        format_timestamp(entry.timestamp.as_deref()),
        level_badge(entry.level.as_deref()),
        html_escape(entry.message.as_deref().unwrap_or("")),
        html_escape(&request)
    )
}

pub fn render_page(page: usize, size: usize, result: &LogPage) -> LogTableView {
    let pager = Pager::for_page(page, size, result.hits.len(), result.total);
    LogTableView {
        total_text: format!("Total: {}", result.total),
        rows_html: result.hits.iter().map(render_row).collect(),
        note: result.note.clone(),
        pager,
        pager_html: pager.to_html(),
    }
}

pub struct LogSearchController {
    backend: Arc<dyn LogSearch>,
    filters: LogFilters,
    page: usize,
    size: usize,
    view: LogTableView,
}

impl LogSearchController {
    pub fn new(backend: Arc<dyn LogSearch>) -> Self {
        Self {
            backend,
            filters: LogFilters::default(),
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            view: LogTableView::default(),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn view(&self) -> &LogTableView {
        &self.view
    }

    pub fn filters(&self) -> &LogFilters {
        &self.filters
    }

    /// Fetch the current page and re-render. On failure the previous
    /// rendering is kept.
    pub async fn load(&mut self) -> Result<&LogTableView, LogSearchError> {
        self.load_page(self.page).await
    }

    /// The page index only moves once the backend has answered.
    async fn load_page(&mut self, page: usize) -> Result<&LogTableView, LogSearchError> {
        let query = self.filters.to_query(page, self.size);
        let result = self.backend.search(&query).await.map_err(|e| {
            tracing::error!(page, "Log search failed: {}", e);
            e
        })?;
        self.page = page;
        self.view = render_page(page, self.size, &result);
        Ok(&self.view)
    }

    /// Form submission: new filters, back to the first page.
    pub async fn submit(&mut self, filters: LogFilters) -> Result<&LogTableView, LogSearchError> {
        self.filters = filters;
        self.load_page(0).await
    }

    pub async fn next(&mut self) -> Result<&LogTableView, LogSearchError> {
        if self.view.pager.next_disabled {
            return Ok(&self.view);
        }
        self.load_page(self.page + 1).await
    }

    pub async fn previous(&mut self) -> Result<&LogTableView, LogSearchError> {
        if self.page == 0 {
            return Ok(&self.view);
        }
        self.load_page(self.page - 1).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct FakeSearch {
        total: u64,
        queries: Mutex<Vec<LogQuery>>,
        fail_next: AtomicBool,
    }

    impl FakeSearch {
        fn new(total: u64) -> Arc<Self> {
            Arc::new(Self {
                total,
                queries: Mutex::new(Vec::new()),
                fail_next: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl LogSearch for FakeSearch {
        async fn search(&self, query: &LogQuery) -> Result<LogPage, LogSearchError> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(LogSearchError::Http { status: 500 });
            }
            let start = (query.page * query.size) as u64;
            let count = self.total.saturating_sub(start).min(query.size as u64);
            let hits = (0..count)
                .map(|i| LogEntry {
                    message: Some(format!("entry {}", start + i)),
                    level: Some("INFO".to_string()),
                    ..LogEntry::default()
                })
                .collect();
            Ok(LogPage {
                total: self.total,
                hits,
                note: None,
            })
        }
    }

    #[test]
    fn test_pager_rules() {
        let first = Pager::for_page(0, 50, 50, 500);
        assert!(first.prev_disabled);
        assert!(!first.next_disabled);

        let short = Pager::for_page(3, 50, 12, 1000);
        assert!(!short.prev_disabled);
        assert!(short.next_disabled);

        // Last page exactly full.
        let exact = Pager::for_page(1, 50, 50, 100);
        assert!(exact.next_disabled);
    }

    #[test]
    fn test_pager_html() {
        let html = Pager::for_page(0, 50, 10, 10).to_html();
        assert!(html.contains(r##"<li class="page-item disabled"><a class="page-link" href="#" id="btn-prev">"##));
        assert!(html.contains(r##"<li class="page-item disabled"><a class="page-link" href="#" id="btn-next">"##));
    }

    #[test]
    fn test_row_escapes_message() {
        let row = render_row(&LogEntry {
            timestamp: Some("not a date".to_string()),
            level: Some("WARNING".to_string()),
            message: Some("<script>x</script>".to_string()),
            method: Some("GET".to_string()),
            path: Some("/map".to_string()),
            status_code: Some(404),
        });
        assert!(row.contains("<code>&lt;script&gt;x&lt;/script&gt;</code>"));
        assert!(row.contains(r#"<span class="badge badge-level badge-WARNING">WARNING</span>"#));
        assert!(row.contains("<td>GET /map 404</td>"));
        assert!(row.starts_with(r#"<tr class="log-row"><td>not a date</td>"#));
    }

    #[test]
    fn test_row_defaults() {
        let row = render_row(&LogEntry::default());
        assert!(row.contains(r#"badge-INFO"></span>"#));
        assert!(row.contains("<code></code>"));
    }

    #[test]
    fn test_timestamp_is_localized() {
        let expected = Utc
            .with_ymd_and_hms(2024, 5, 1, 8, 30, 0)
            .unwrap()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(format_timestamp(Some("2024-05-01T08:30:00Z")), expected);
        assert_eq!(format_timestamp(None), "");
    }

    #[test]
    fn test_filters_to_query() {
        let filters = LogFilters {
            q: "  timeout ".to_string(),
            level: "ERROR".to_string(),
            from: "2024-05-01T08:30".to_string(),
            to: String::new(),
        };
        let query = filters.to_query(3, 50);
        let expected_from = Local
            .with_ymd_and_hms(2024, 5, 1, 8, 30, 0)
            .earliest()
            .map(|t| t.with_timezone(&Utc));
        assert_eq!(query.q.as_deref(), Some("timeout"));
        assert_eq!(query.level.as_deref(), Some("ERROR"));
        assert_eq!(query.from, expected_from);
        assert_eq!(query.to, None);
        assert_eq!(query.page, 3);
    }

    #[test]
    fn test_rfc3339_filter_value() {
        assert_eq!(
            parse_local_datetime("2024-05-01T08:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap())
        );
        assert_eq!(parse_local_datetime("yesterday"), None);
    }

    #[tokio::test]
    async fn test_paging_through_results() {
        let backend = FakeSearch::new(120);
        let mut c = LogSearchController::new(backend.clone());

        let view = c.load().await.unwrap();
        assert_eq!(view.total_text, "Total: 120");
        assert!(view.pager.prev_disabled);
        assert!(!view.pager.next_disabled);
        assert_eq!(view.rows_html.matches("<tr").count(), 50);

        c.next().await.unwrap();
        c.next().await.unwrap();
        assert_eq!(c.page(), 2);
        assert!(c.view().pager.next_disabled);
        assert_eq!(c.view().rows_html.matches("<tr").count(), 20);

        // Next is a no-op on the last page.
        c.next().await.unwrap();
        assert_eq!(c.page(), 2);

        c.previous().await.unwrap();
        assert_eq!(c.page(), 1);
        assert_eq!(backend.queries.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_previous_is_a_noop_on_first_page() {
        let backend = FakeSearch::new(10);
        let mut c = LogSearchController::new(backend.clone());
        c.load().await.unwrap();

        c.previous().await.unwrap();

        assert_eq!(c.page(), 0);
        assert_eq!(backend.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_resets_to_first_page() {
        let backend = FakeSearch::new(200);
        let mut c = LogSearchController::new(backend.clone());
        c.load().await.unwrap();
        c.next().await.unwrap();
        assert_eq!(c.page(), 1);

        c.submit(LogFilters {
            level: "ERROR".to_string(),
            ..LogFilters::default()
        })
        .await
        .unwrap();

        assert_eq!(c.page(), 0);
        let queries = backend.queries.lock().unwrap();
        let last = queries.last().unwrap();
        assert_eq!(last.page, 0);
        assert_eq!(last.level.as_deref(), Some("ERROR"));
        assert_eq!(c.filters().level, "ERROR");
    }

    #[tokio::test]
    async fn test_failed_page_change_keeps_position() {
        let backend = FakeSearch::new(1000);
        let mut c = LogSearchController::new(backend.clone());
        c.load().await.unwrap();

        backend.fail_next.store(true, Ordering::SeqCst);
        let err = c.next().await.unwrap_err();
        assert!(matches!(err, LogSearchError::Http { status: 500 }));
        assert_eq!(c.page(), 0);
        assert_eq!(c.view().pager.page, 0);

        c.next().await.unwrap();
        assert_eq!(c.page(), 1);
        assert_eq!(c.view().pager.page, 1);
        let pages: Vec<usize> = backend.queries.lock().unwrap().iter().map(|q| q.page).collect();
        assert_eq!(pages, vec![0, 1, 1]);

        backend.fail_next.store(true, Ordering::SeqCst);
        assert!(c.previous().await.is_err());
        assert_eq!(c.page(), 1);
    }
}
