use thiserror::Error;

use crate::net::FetchError;

/// Every way a crawl unit can fail. Only `CategoryFetch` aborts a run; the
/// rest are logged and skip a single category, course URL or record.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("category tree read failed ({url}): {reason}")]
    CategoryFetch { url: String, reason: String },

    #[error("category course list read failed: {main}, {sub}: {source}")]
    CategoryListFetch {
        main: String,
        sub: String,
        #[source]
        source: FetchError,
    },

    #[error("course url read failed, anchor tag does not exist: {main}, {sub}")]
    MissingAnchor { main: String, sub: String },

    #[error("course page read failed: {0}")]
    CourseFetch(#[source] FetchError),

    #[error("<script type=\"application/ld+json\"> does not exist")]
    MissingStructuredData,

    #[error("application/ld+json parsing failed: {0}")]
    StructuredDataParse(#[source] serde_json::Error),

    #[error("product offer is empty")]
    EmptyOffer,

    #[error("price specification is empty")]
    EmptyPriceSpec,

    #[error("course detail read failed for product {product_id}: {reason}")]
    SupplementaryFetch { product_id: i64, reason: String },

    #[error("course detail is empty for product {0}")]
    EmptyCourseRecord(i64),

    #[error("course title is empty for product {0}")]
    MissingTitle(i64),

    #[error("category conversion failed: main category {main}, sub category {sub}")]
    NoMapping { main: String, sub: String },
}

impl CrawlError {
    /// Short stable label, used as a structured log field and in run stats.
    pub fn kind(&self) -> &'static str {
        match self {
            CrawlError::CategoryFetch { .. } => "category_fetch",
            CrawlError::CategoryListFetch { .. } => "category_list_fetch",
            CrawlError::MissingAnchor { .. } => "missing_anchor",
            CrawlError::CourseFetch(_) => "course_fetch",
            CrawlError::MissingStructuredData => "missing_structured_data",
            CrawlError::StructuredDataParse(_) => "structured_data_parse",
            CrawlError::EmptyOffer => "empty_offer",
            CrawlError::EmptyPriceSpec => "empty_price_spec",
            CrawlError::SupplementaryFetch { .. } => "supplementary_fetch",
            CrawlError::EmptyCourseRecord(_) => "empty_course_record",
            CrawlError::MissingTitle(_) => "missing_title",
            CrawlError::NoMapping { .. } => "no_mapping",
        }
    }
}
