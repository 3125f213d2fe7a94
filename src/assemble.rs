use std::collections::HashSet;

use tracing::{debug, warn};

use crate::db::CanonicalLecture;
use crate::detail::RawCourse;
use crate::taxonomy::Taxonomy;

pub struct Assembled {
    pub lectures: Vec<CanonicalLecture>,
    pub duplicates: usize,
    pub unmapped: usize,
}

/// Deduplicate by source id (first occurrence wins) and map each survivor onto
/// the canonical taxonomy. Courses without a mapping are dropped.
pub fn assemble(source: &str, courses: &[RawCourse], taxonomy: &Taxonomy) -> Assembled {
    let mut seen = HashSet::new();
    let mut lectures = Vec::new();
    let mut duplicates = 0;
    let mut unmapped = 0;

    for course in courses {
        if !seen.insert(course.source_id) {
            debug!(source_id = course.source_id, url = %course.url, "Duplicate course skipped");
            duplicates += 1;
            continue;
        }

        let (main, sub) = match taxonomy.map(&course.main_category, &course.sub_category) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(source_id = course.source_id, kind = e.kind(), "{}", e);
                unmapped += 1;
                continue;
            }
        };

        lectures.push(CanonicalLecture {
            title: course.title.clone(),
            source: source.to_string(),
            source_id: course.source_id.to_string(),
            url: course.url.clone(),
            price: course.price.to_string(),
            instructor: course.instructor.clone(),
            image_url: course.image_url.clone(),
            source_main_category: course.main_category.clone(),
            source_sub_category: course.sub_category.clone(),
            main_category: main.to_string(),
            sub_category: sub.to_string(),
            keywords: course.keywords.clone(),
            description: course.description.clone(),
        });
    }

    Assembled {
        lectures,
        duplicates,
        unmapped,
    }
}
