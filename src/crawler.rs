use std::collections::BTreeMap;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::catalog::{self, LeafCategory};
use crate::detail::{self, RawCourse};
use crate::error::CrawlError;
use crate::listing;
use crate::net::Transport;
use crate::settings::Endpoints;

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Detail pages fetched at once; 1 means strictly sequential.
    pub concurrency: usize,
    /// Cap on the number of course URLs visited.
    pub limit: Option<usize>,
    pub progress: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            limit: None,
            progress: false,
        }
    }
}

/// One course URL to visit, with its position in category traversal order.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub index: usize,
    pub leaf: Arc<LeafCategory>,
    pub url: String,
}

pub struct CrawlReport {
    pub categories: usize,
    pub skipped_categories: usize,
    pub urls: usize,
    /// In traversal order, whatever the concurrency.
    pub courses: Vec<RawCourse>,
    pub skipped: BTreeMap<&'static str, usize>,
}

impl CrawlReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Category tree → listings → course details. Only a category tree failure is
/// returned as an error; everything else is logged and counted.
pub async fn crawl<T: Transport + 'static>(
    transport: Arc<T>,
    endpoints: &Endpoints,
    options: &CrawlOptions,
) -> Result<CrawlReport, CrawlError> {
    info!("Get coloso categories");
    let categories = catalog::fetch_categories(transport.as_ref(), endpoints).await?;
    let leaves = catalog::leaves(&categories);

    info!("Get coloso courses");
    let (mut work, skipped_categories) =
        build_work_list(transport.as_ref(), endpoints, &leaves).await;
    if let Some(limit) = options.limit {
        work.truncate(limit);
    }
    let urls = work.len();
    info!(
        categories = leaves.len(),
        skipped_categories,
        urls,
        concurrency = options.concurrency,
        "Work list ready"
    );

    let pb = progress_bar(urls, options.progress);
    let results = if options.concurrency <= 1 {
        extract_sequential(transport.as_ref(), endpoints, work, &pb).await
    } else {
        extract_concurrent(transport, endpoints, work, options.concurrency, &pb).await
    };
    pb.finish_and_clear();

    let (courses, skipped) = fold_results(results);
    info!(
        courses = courses.len(),
        skipped = skipped.values().sum::<usize>(),
        "Course extraction finished"
    );

    Ok(CrawlReport {
        categories: leaves.len(),
        skipped_categories,
        urls,
        courses,
        skipped,
    })
}

/// Cross product of leaf categories and their course URLs, in traversal order.
/// A category whose listing cannot be read contributes nothing.
pub async fn build_work_list<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
    leaves: &[LeafCategory],
) -> (Vec<WorkItem>, usize) {
    let mut work = Vec::new();
    let mut skipped = 0;

    for leaf in leaves {
        match listing::fetch_course_urls(transport, endpoints, leaf).await {
            Ok(urls) => {
                let leaf = Arc::new(leaf.clone());
                for url in urls {
                    work.push(WorkItem {
                        index: work.len(),
                        leaf: Arc::clone(&leaf),
                        url,
                    });
                }
            }
            Err(e) => {
                warn!(kind = e.kind(), "{}", e);
                skipped += 1;
            }
        }
    }

    (work, skipped)
}

type ItemResult = (WorkItem, Result<RawCourse, CrawlError>);

async fn extract_sequential<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
    work: Vec<WorkItem>,
    pb: &ProgressBar,
) -> Vec<ItemResult> {
    let mut results = Vec::with_capacity(work.len());
    for item in work {
        let result = detail::extract_course(
            transport,
            endpoints,
            &item.url,
            &item.leaf.main_title,
            &item.leaf.sub_title,
        )
        .await;
        results.push((item, result));
        pb.inc(1);
    }
    results
}

async fn extract_concurrent<T: Transport + 'static>(
    transport: Arc<T>,
    endpoints: &Endpoints,
    work: Vec<WorkItem>,
    concurrency: usize,
    pb: &ProgressBar,
) -> Vec<ItemResult> {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let endpoints = Arc::new(endpoints.clone());
    let total = work.len();

    // Workers send results, this task collects them
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ItemResult>(concurrency * 2);

    for item in work {
        let transport = Arc::clone(&transport);
        let endpoints = Arc::clone(&endpoints);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let result = detail::extract_course(
                transport.as_ref(),
                &endpoints,
                &item.url,
                &item.leaf.main_title,
                &item.leaf.sub_title,
            )
            .await;
            let _ = tx.send((item, result)).await;
        });
    }

    // rx closes once every spawned task has dropped its sender
    drop(tx);

    let mut results = Vec::with_capacity(total);
    while let Some(result) = rx.recv().await {
        results.push(result);
        pb.inc(1);
    }
    if results.len() < total {
        warn!(lost = total - results.len(), "Some course tasks ended without a result");
    }

    // Restore traversal order so deduplication matches the sequential run
    results.sort_by_key(|(item, _)| item.index);
    results
}

/// Keep the successes in order; log and count the rest by kind.
fn fold_results(results: Vec<ItemResult>) -> (Vec<RawCourse>, BTreeMap<&'static str, usize>) {
    results.into_iter().fold(
        (Vec::new(), BTreeMap::new()),
        |(mut courses, mut skipped), (item, result)| {
            match result {
                Ok(course) => {
                    info!("{}", course);
                    courses.push(course);
                }
                Err(e) => {
                    warn!(
                        url = %item.url,
                        main = %item.leaf.main_title,
                        sub = %item.leaf.sub_title,
                        kind = e.kind(),
                        "{}",
                        e
                    );
                    *skipped.entry(e.kind()).or_insert(0) += 1;
                }
            }
            (courses, skipped)
        },
    )
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
