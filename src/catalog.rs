use serde::Deserialize;
use tracing::{error, info};

use crate::error::CrawlError;
use crate::net::Transport;
use crate::settings::Endpoints;

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryNode {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub children: Vec<CategoryNode>,
}

/// A subcategory together with its parent's title: the unit listings are fetched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCategory {
    pub id: i64,
    pub main_title: String,
    pub sub_title: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoriesResponse {
    Bare(Vec<CategoryNode>),
    Wrapped { categories: Vec<CategoryNode> },
}

/// Fetch the two-level category tree. Any failure here is fatal for the run.
pub async fn fetch_categories<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
) -> Result<Vec<CategoryNode>, CrawlError> {
    let url = endpoints.categories();
    let fail = |reason: String| {
        error!(url = %url, %reason, "Coloso course categories read failed");
        CrawlError::CategoryFetch {
            url: url.clone(),
            reason,
        }
    };

    let body = transport.get_text(&url).await.map_err(|e| fail(e.to_string()))?;
    let categories = parse_categories(&body).map_err(|e| fail(e.to_string()))?;

    for leaf in leaves(&categories) {
        info!("{}, {}", leaf.main_title, leaf.sub_title);
    }
    Ok(categories)
}

pub fn parse_categories(body: &str) -> serde_json::Result<Vec<CategoryNode>> {
    Ok(match serde_json::from_str(body)? {
        CategoriesResponse::Bare(categories) => categories,
        CategoriesResponse::Wrapped { categories } => categories,
    })
}

/// Flatten main → sub in order. Anything below the subcategory level is ignored.
pub fn leaves(categories: &[CategoryNode]) -> Vec<LeafCategory> {
    categories
        .iter()
        .flat_map(|main| {
            main.children.iter().map(move |sub| LeafCategory {
                id: sub.id,
                main_title: main.title.clone(),
                sub_title: sub.title.clone(),
            })
        })
        .collect()
}
