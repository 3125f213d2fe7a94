use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::catalog::LeafCategory;
use crate::error::CrawlError;
use crate::net::Transport;
use crate::settings::Endpoints;

static COURSE_ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section > h3 ~ ul > li").unwrap());

/// Fetch one leaf category's listing page and return its course URLs in page order.
pub async fn fetch_course_urls<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
    leaf: &LeafCategory,
) -> Result<Vec<String>, CrawlError> {
    let url = endpoints.category_courses(leaf.id);
    info!(
        main = %leaf.main_title,
        sub = %leaf.sub_title,
        "Get coloso courses from {}, {}",
        leaf.main_title,
        leaf.sub_title
    );

    let html = transport
        .get_text(&url)
        .await
        .map_err(|source| CrawlError::CategoryListFetch {
            main: leaf.main_title.clone(),
            sub: leaf.sub_title.clone(),
            source,
        })?;

    let page_url = Url::parse(&url).ok();
    let mut urls = Vec::new();
    for item in extract_course_links(&html, page_url.as_ref()) {
        match item {
            Some(course_url) => urls.push(course_url),
            None => {
                let e = CrawlError::MissingAnchor {
                    main: leaf.main_title.clone(),
                    sub: leaf.sub_title.clone(),
                };
                warn!(kind = e.kind(), "{}", e);
            }
        }
    }
    Ok(urls)
}

/// One entry per course list item: `Some(absolute url)` or `None` when the item
/// has no direct anchor with a usable href.
pub fn extract_course_links(html: &str, page_url: Option<&Url>) -> Vec<Option<String>> {
    let document = Html::parse_document(html);
    document
        .select(&COURSE_ITEM_SEL)
        .map(|li| {
            let href = first_child_anchor(li)?.value().attr("href")?;
            absolutize(href, page_url)
        })
        .collect()
}

fn first_child_anchor(li: ElementRef<'_>) -> Option<ElementRef<'_>> {
    li.children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
}

fn absolutize(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match base {
        Some(base) => base.join(href).ok().map(String::from),
        None => Url::parse(href).ok().map(String::from),
    }
}
