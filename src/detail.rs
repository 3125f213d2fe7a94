use std::fmt;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::{Deserialize, Deserializer};

use crate::error::CrawlError;
use crate::net::Transport;
use crate::settings::Endpoints;
use crate::text;

static LD_JSON_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// A course as scraped, before deduplication and taxonomy mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCourse {
    pub source_id: i64,
    pub title: String,
    pub price: i64,
    pub description: String,
    pub keywords: String,
    pub instructor: String,
    pub main_category: String,
    pub sub_category: String,
    pub url: String,
    pub image_url: String,
}

impl fmt::Display for RawCourse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.source_id,
            self.title,
            self.instructor,
            self.price,
            self.main_category,
            self.sub_category,
            self.description,
            self.keywords,
            self.url,
            self.image_url
        )
    }
}

// ── JSON-LD product block ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Product {
    #[serde(deserialize_with = "lenient_i64")]
    product_id: i64,
    #[serde(default)]
    offers: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Offer {
    #[serde(default)]
    price_specifications: Vec<PriceSpecification>,
}

#[derive(Debug, Deserialize)]
struct PriceSpecification {
    #[serde(deserialize_with = "lenient_i64")]
    price: i64,
}

/// Accepts `42`, `42.0` and `"42"`; linked data in the wild uses all three.
fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    use serde::de::Error;

    match serde_json::Value::deserialize(d)? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("not an integer: {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("not an integer: {s:?}"))),
        other => Err(D::Error::custom(format!("expected integer, got {other}"))),
    }
}

// ── Supplementary course record ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseRecord {
    #[serde(default)]
    public_title: Option<String>,
    #[serde(default)]
    instructor: Option<String>,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    desktop_card_asset: Option<String>,
    #[serde(default)]
    extras: Option<Extras>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Extras {
    additional_text1: Option<String>,
    additional_text2: Option<String>,
    additional_text3: Option<String>,
}

impl Extras {
    fn description(&self) -> String {
        text::join_non_blank([
            self.additional_text1.as_deref(),
            self.additional_text2.as_deref(),
            self.additional_text3.as_deref(),
        ])
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CourseResponse {
    Bare(Vec<CourseRecord>),
    Wrapped { courses: Vec<CourseRecord> },
}

/// What the product page contributes: identifier and listed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSummary {
    pub product_id: i64,
    pub price: i64,
}

/// Pull the product id and first listed price out of a course page's JSON-LD block.
pub fn parse_product(html: &str) -> Result<ProductSummary, CrawlError> {
    let json = {
        let document = Html::parse_document(html);
        let script = document
            .select(&LD_JSON_SEL)
            .next()
            .ok_or(CrawlError::MissingStructuredData)?;
        script.text().collect::<String>()
    };

    let product: Product = serde_json::from_str(&json).map_err(CrawlError::StructuredDataParse)?;
    let offer = product.offers.first().ok_or(CrawlError::EmptyOffer)?;
    let spec = offer
        .price_specifications
        .first()
        .ok_or(CrawlError::EmptyPriceSpec)?;

    Ok(ProductSummary {
        product_id: product.product_id,
        price: spec.price,
    })
}

/// Combine the product summary with the supplementary record for the same id.
fn merge(
    summary: ProductSummary,
    body: &str,
    url: &str,
    main: &str,
    sub: &str,
) -> Result<RawCourse, CrawlError> {
    let id = summary.product_id;
    let records = match serde_json::from_str(body) {
        Ok(CourseResponse::Bare(records)) => records,
        Ok(CourseResponse::Wrapped { courses }) => courses,
        Err(e) => {
            return Err(CrawlError::SupplementaryFetch {
                product_id: id,
                reason: e.to_string(),
            })
        }
    };
    let record = records
        .into_iter()
        .next()
        .ok_or(CrawlError::EmptyCourseRecord(id))?;

    let title = record
        .public_title
        .filter(|t| !t.trim().is_empty())
        .ok_or(CrawlError::MissingTitle(id))?;
    let description = record
        .extras
        .as_ref()
        .map(|e| text::normalize(&e.description()))
        .unwrap_or_default();

    Ok(RawCourse {
        source_id: id,
        title,
        price: summary.price,
        description,
        keywords: text::normalize(record.keywords.as_deref().unwrap_or_default()),
        instructor: record.instructor.unwrap_or_default(),
        main_category: main.to_string(),
        sub_category: sub.to_string(),
        url: url.to_string(),
        image_url: record.desktop_card_asset.unwrap_or_default(),
    })
}

/// Detail page → JSON-LD → supplementary record → `RawCourse`.
///
/// Each step either succeeds or returns the reason this course is skipped; the
/// caller decides what to log. Exactly two requests on the happy path.
pub async fn extract_course<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
    url: &str,
    main: &str,
    sub: &str,
) -> Result<RawCourse, CrawlError> {
    let html = transport
        .get_text(url)
        .await
        .map_err(CrawlError::CourseFetch)?;
    let summary = parse_product(&html)?;

    let body = transport
        .get_text(&endpoints.course_detail(summary.product_id))
        .await
        .map_err(|e| CrawlError::SupplementaryFetch {
            product_id: summary.product_id,
            reason: e.to_string(),
        })?;

    merge(summary, &body, url, main, sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::fake::FakeTransport;

    const BASE: &str = "https://coloso.test";

    fn page(ld_json: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">{ld_json}</script></head><body></body></html>"#
        )
    }

    #[test]
    fn product_from_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/course_42.html").unwrap();
        let p = parse_product(&html).unwrap();
        assert_eq!(p, ProductSummary { product_id: 42, price: 99000 });
    }

    #[test]
    fn product_accepts_string_numbers() {
        let html = page(r#"{"productId":"42","offers":[{"priceSpecifications":[{"price":"99000"}]}]}"#);
        assert_eq!(parse_product(&html).unwrap().price, 99000);
        let html = page(r#"{"productId":42,"offers":[{"priceSpecifications":[{"price":99000.0}]}]}"#);
        assert_eq!(parse_product(&html).unwrap().product_id, 42);
    }

    #[test]
    fn product_failures() {
        let no_script = "<html><script>var x = 1;</script></html>";
        assert!(matches!(parse_product(no_script), Err(CrawlError::MissingStructuredData)));

        let broken = page("{not json");
        assert!(matches!(parse_product(&broken), Err(CrawlError::StructuredDataParse(_))));

        let no_offers = page(r#"{"productId":42,"offers":[]}"#);
        assert!(matches!(parse_product(&no_offers), Err(CrawlError::EmptyOffer)));

        let no_specs = page(r#"{"productId":42,"offers":[{"priceSpecifications":[]}]}"#);
        assert!(matches!(parse_product(&no_specs), Err(CrawlError::EmptyPriceSpec)));
    }

    #[test]
    fn merge_without_extras_has_empty_description() {
        let summary = ProductSummary { product_id: 5, price: 1000 };
        let body = r#"{"courses":[{"publicTitle":"T","instructor":"I","keywords":"a\n b","desktopCardAsset":"x.png"}]}"#;
        let c = merge(summary, body, "u", "m", "s").unwrap();
        assert_eq!(c.description, "");
        assert_eq!(c.keywords, "a b");
    }

    #[test]
    fn merge_failures() {
        let summary = ProductSummary { product_id: 5, price: 1000 };
        assert!(matches!(
            merge(summary, "[]", "u", "m", "s"),
            Err(CrawlError::EmptyCourseRecord(5))
        ));
        assert!(matches!(
            merge(summary, "null", "u", "m", "s"),
            Err(CrawlError::SupplementaryFetch { product_id: 5, .. })
        ));
        assert!(matches!(
            merge(summary, r#"[{"publicTitle":"  "}]"#, "u", "m", "s"),
            Err(CrawlError::MissingTitle(5))
        ));
    }

    #[tokio::test]
    async fn extracts_full_course() {
        let endpoints = Endpoints::new(BASE);
        let url = "https://coloso.test/courses/42";
        let t = FakeTransport::new()
            .with(url, &std::fs::read_to_string("tests/fixtures/course_42.html").unwrap())
            .with(
                &endpoints.course_detail(42),
                &std::fs::read_to_string("tests/fixtures/course_42.json").unwrap(),
            );

        let c = extract_course(&t, &endpoints, url, "Design", "Illustration")
            .await
            .unwrap();
        assert_eq!(
            c,
            RawCourse {
                source_id: 42,
                title: "Intro to Illustration".into(),
                price: 99000,
                description: "Learn the basics of digital art".into(),
                keywords: "draw illustration".into(),
                instructor: "Jane Doe".into(),
                main_category: "Design".into(),
                sub_category: "Illustration".into(),
                url: url.into(),
                image_url: "img.jpg".into(),
            }
        );
        assert_eq!(
            c.to_string(),
            "42\tIntro to Illustration\tJane Doe\t99000\tDesign\tIllustration\t\
             Learn the basics of digital art\tdraw illustration\thttps://coloso.test/courses/42\timg.jpg"
        );
    }

    #[tokio::test]
    async fn page_without_structured_data_skips_supplementary_call() {
        let endpoints = Endpoints::new(BASE);
        let url = "https://coloso.test/courses/1";
        let t = FakeTransport::new().with(url, "<html><body>sold out</body></html>");

        let err = extract_course(&t, &endpoints, url, "m", "s").await.unwrap_err();
        assert!(matches!(err, CrawlError::MissingStructuredData));
        assert_eq!(t.requests(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn fetch_failures_map_to_their_kind() {
        let endpoints = Endpoints::new(BASE);
        let url = "https://coloso.test/courses/42";

        let nothing = FakeTransport::new();
        let err = extract_course(&nothing, &endpoints, url, "m", "s").await.unwrap_err();
        assert_eq!(err.kind(), "course_fetch");

        let page_only = FakeTransport::new().with(
            url,
            &std::fs::read_to_string("tests/fixtures/course_42.html").unwrap(),
        );
        let err = extract_course(&page_only, &endpoints, url, "m", "s").await.unwrap_err();
        assert_eq!(err.kind(), "supplementary_fetch");
    }
}
