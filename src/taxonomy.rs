use crate::error::CrawlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxonomyEntry {
    pub source_main: &'static str,
    pub source_sub: &'static str,
    pub canonical_main: &'static str,
    pub canonical_sub: &'static str,
}

const fn entry(
    source_main: &'static str,
    source_sub: &'static str,
    canonical_main: &'static str,
    canonical_sub: &'static str,
) -> TaxonomyEntry {
    TaxonomyEntry {
        source_main,
        source_sub,
        canonical_main,
        canonical_sub,
    }
}

/// Coloso (main, sub) → canonical (main, sub). Keys must be unique.
static COLOSO_TABLE: &[TaxonomyEntry] = &[
    entry("드로잉", "캐릭터 일러스트", "디자인", "일러스트"),
    entry("드로잉", "배경 일러스트", "디자인", "일러스트"),
    entry("드로잉", "웹툰·만화", "디자인", "웹툰"),
    entry("드로잉", "컨셉아트", "디자인", "일러스트"),
    entry("영상·3D·VFX", "3D 모델링", "디자인", "3D"),
    entry("영상·3D·VFX", "영상 편집", "영상·사진", "영상 편집"),
    entry("영상·3D·VFX", "모션그래픽", "영상·사진", "모션그래픽"),
    entry("영상·3D·VFX", "VFX", "영상·사진", "VFX"),
    entry("디자인", "UX/UI", "디자인", "UX/UI"),
    entry("디자인", "브랜딩", "디자인", "그래픽 디자인"),
    entry("디자인", "그래픽 디자인", "디자인", "그래픽 디자인"),
    entry("디자인", "타이포그래피", "디자인", "그래픽 디자인"),
    entry("게임", "게임 아트", "게임", "게임 아트"),
    entry("게임", "게임 기획", "게임", "게임 기획"),
    entry("게임", "게임 개발", "개발·프로그래밍", "게임 개발"),
    entry("개발·데이터", "프로그래밍", "개발·프로그래밍", "프로그래밍 언어"),
    entry("개발·데이터", "데이터 사이언스", "데이터 사이언스", "데이터 분석"),
    entry("개발·데이터", "AI", "데이터 사이언스", "인공지능"),
    entry("사진", "사진 촬영", "영상·사진", "사진"),
    entry("사진", "보정", "영상·사진", "사진"),
    entry("음악·사운드", "작곡", "음악", "작곡"),
    entry("음악·사운드", "믹싱·마스터링", "음악", "사운드 엔지니어링"),
    entry("마케팅", "퍼포먼스 마케팅", "마케팅", "디지털 마케팅"),
    entry("마케팅", "콘텐츠 마케팅", "마케팅", "콘텐츠 마케팅"),
];

/// Ordered lookup table; the first entry whose source pair matches exactly wins.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: Vec<TaxonomyEntry>,
}

impl Taxonomy {
    pub fn coloso() -> Self {
        Self::new(COLOSO_TABLE.to_vec())
    }

    pub fn new(entries: Vec<TaxonomyEntry>) -> Self {
        Self { entries }
    }

    pub fn map(&self, main: &str, sub: &str) -> Result<(&'static str, &'static str), CrawlError> {
        self.entries
            .iter()
            .find(|e| e.source_main == main && e.source_sub == sub)
            .map(|e| (e.canonical_main, e.canonical_sub))
            .ok_or_else(|| CrawlError::NoMapping {
                main: main.to_string(),
                sub: sub.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn every_table_entry_maps_to_itself() {
        let t = Taxonomy::coloso();
        for e in COLOSO_TABLE {
            let got = t.map(e.source_main, e.source_sub).unwrap();
            assert_eq!(got, (e.canonical_main, e.canonical_sub));
        }
    }

    #[test]
    fn table_has_no_duplicate_keys() {
        let mut seen = HashSet::new();
        for e in COLOSO_TABLE {
            assert!(
                seen.insert((e.source_main, e.source_sub)),
                "duplicate key: {} / {}",
                e.source_main,
                e.source_sub
            );
        }
    }

    #[test]
    fn absent_pairs_signal_no_mapping() {
        let t = Taxonomy::coloso();
        // Sub exists, but under a different main
        let err = t.map("디자인", "작곡").unwrap_err();
        assert!(matches!(err, CrawlError::NoMapping { .. }));
        // Exact match only: no trimming or case folding
        assert!(t.map("드로잉 ", "캐릭터 일러스트").is_err());
        assert!(t.map("디자인", "ux/ui").is_err());
        assert!(t.map("Design", "Illustration").is_err());
    }

    #[test]
    fn first_match_wins_on_overlap() {
        let t = Taxonomy::new(vec![
            entry("Design", "Illustration", "디자인", "일러스트"),
            entry("Design", "Illustration", "기타", "기타"),
        ]);
        assert_eq!(t.map("Design", "Illustration").unwrap(), ("디자인", "일러스트"));
    }
}
