use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use city_scrapers::app::ports::HttpClientPort;
use city_scrapers::config::HttpConfig;
use city_scrapers::crawler::Crawler;
use city_scrapers::infra::http_client::ReqwestHttp;
use city_scrapers::spiders::ChiBuildingsSpider;
use city_scrapers::{Event, ParseOutput, Request, Response, Spider};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const LIVE_SITE: &str = "http://www.pbcchicago.com";

/// Minimal HTTP/1.1 server on a loopback port serving the calendar fixtures
struct LocalSite {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl LocalSite {
    async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base = format!("http://{}", listener.local_addr()?);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let listing = include_str!("files/chi_buildings.json").replace(LIVE_SITE, &base);
        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let listing = listing.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &listing, &recorded).await;
                });
            }
        });

        Ok(Self { base, requests })
    }

    fn recorded(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(mut stream: TcpStream, listing: &str, recorded: &Mutex<Vec<String>>) -> Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
    let head = String::from_utf8_lossy(&head).to_string();
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    recorded.lock().unwrap().push(head);

    let (status, extra, content_type, body) = if path.contains("admin-ajax.php") {
        ("200 OK", String::new(), "application/json", listing.to_string())
    } else if path.contains("february") {
        ("404 Not Found", String::new(), "text/html", "Not Found".to_string())
    } else if path.starts_with("/events/event/moved") {
        (
            "301 Moved Permanently",
            "Location: /events/event/new-home/\r\n".to_string(),
            "text/html",
            String::new(),
        )
    } else {
        (
            "200 OK",
            String::new(),
            "text/html; charset=UTF-8",
            include_str!("files/chi_buildings.html").to_string(),
        )
    };

    let response = format!(
        "HTTP/1.1 {status}\r\n{extra}Content-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// The real spider, pointed at the loopback site instead of pbcchicago.com
struct LocalChiBuildings {
    inner: ChiBuildingsSpider,
    base: String,
}

impl Spider for LocalChiBuildings {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn agency_name(&self) -> &'static str {
        self.inner.agency_name()
    }

    fn timezone(&self) -> &'static str {
        self.inner.timezone()
    }

    fn start_requests(&self, _now: NaiveDateTime) -> Vec<Request> {
        vec![Request::listing(format!(
            "{}/wp-admin/admin-ajax.php?action=eventorganiser-fullcal",
            self.base
        ))]
    }

    fn parse(&self, response: &Response) -> city_scrapers::Result<Vec<ParseOutput>> {
        self.inner.parse(response)
    }

    fn parse_detail(&self, response: &Response, item: Event) -> city_scrapers::Result<Event> {
        self.inner.parse_detail(response, item)
    }
}

fn frozen_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, 12, 19)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[tokio::test]
async fn test_reqwest_crawl_against_local_site() -> Result<()> {
    let site = LocalSite::start().await?;
    let spider = LocalChiBuildings {
        inner: ChiBuildingsSpider::default().at(frozen_now()),
        base: site.base.clone(),
    };
    let http = Arc::new(ReqwestHttp::new(&HttpConfig::default())?);

    let outcome = Crawler::new(http).crawl(&spider, frozen_now()).await;

    assert_eq!(outcome.requests, 6);
    assert_eq!(outcome.items.len(), 4);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("february"));
    assert!(outcome.errors[0].contains("failed with status 404"));

    let first = &outcome.items[0];
    assert_eq!(first.name, "Administrative Operations Committee");
    assert_eq!(first.documents.len(), 4);
    assert_eq!(first.location.address, "50 W. Washington Street Chicago, IL 60602");
    assert_eq!(first.location.coordinates.latitude, "41.884089");

    let recorded = site.recorded();
    assert_eq!(recorded.len(), 6);
    for head in &recorded {
        assert!(head.to_lowercase().contains("user-agent: city_scrapers/"));
    }
    Ok(())
}

#[tokio::test]
async fn test_reqwest_reports_status_and_final_url() -> Result<()> {
    let site = LocalSite::start().await?;
    let config = HttpConfig {
        user_agent: "pbc-test-agent/1.0".to_string(),
        ..HttpConfig::default()
    };
    let http = ReqwestHttp::new(&config)?;

    let page = format!("{}/events/event/pbc-administrative-operations-committee/", site.base);
    let ok = http.get(&page).await?;
    assert_eq!(ok.status, 200);
    assert!(ok.is_success());
    assert_eq!(ok.url, page);
    assert!(String::from_utf8_lossy(&ok.bytes).contains("eventorganiser"));

    let moved = http.get(&format!("{}/events/event/moved/", site.base)).await?;
    assert_eq!(moved.status, 200);
    assert_eq!(moved.url, format!("{}/events/event/new-home/", site.base));

    let missing = http
        .get(&format!("{}/events/event/board-meeting-february/", site.base))
        .await?;
    assert_eq!(missing.status, 404);
    assert!(!missing.is_success());

    assert!(site
        .recorded()
        .iter()
        .all(|head| head.to_lowercase().contains("user-agent: pbc-test-agent/1.0")));
    Ok(())
}
