//! Well-known `$` type shortcuts and the predicate fragments they expand to.

/// One alternative of a named filter: each field must match any of its values.
pub type Fragment = &'static [(&'static str, &'static [&'static str])];

// ---------------------------------------------------------------------------
// Type families
// ---------------------------------------------------------------------------

pub const APP_TYPES: &[&str] = &[
    "Web Mapping Application",
    "Application",
    "Mobile Application",
    "Native Application",
    "Operations Dashboard Application",
    "Dashboard",
    "Insights Page",
    "Insights Workbook",
    "Web Experience",
    "StoryMap",
];

pub const DATASET_TYPES: &[&str] = &[
    "Feature Service",
    "Map Service",
    "Image Service",
    "Vector Tile Service",
    "Scene Service",
    "WFS",
    "WMS",
    "KML",
    "KML Collection",
    "Feature Collection",
    "Table",
    "CSV",
    "CSV Collection",
    "Shapefile",
    "File Geodatabase",
    "GeoJson",
    "GeoPackage",
    "Microsoft Excel",
];

pub const DOCUMENT_TYPES: &[&str] = &[
    "PDF",
    "Microsoft Word",
    "Microsoft Powerpoint",
    "Document Link",
    "Image",
    "Visio Document",
    "Report Template",
];

pub const MAP_TYPES: &[&str] = &["Web Map", "Web Scene", "Mobile Map Package", "Map Area"];

pub const SITE_TYPES: &[&str] = &["Hub Site Application", "Site Application"];

pub const INITIATIVE_TYPES: &[&str] = &["Hub Initiative"];

pub const TEMPLATE_TYPES: &[&str] = &["Solution", "Hub Initiative Template"];

pub const FEEDBACK_TYPES: &[&str] = &["Form", "Quick Capture Project"];

pub const EXPERIENCE_TYPES: &[&str] = &["Web Experience"];

const WEB_MAPPING_APPLICATION: &[&str] = &["Web Mapping Application"];
const STORYMAP_TYPE: &[&str] = &["StoryMap"];
const STORYMAP_KEYWORD: &[&str] = &["Story Map"];
const DASHBOARD_TYPE: &[&str] = &["Dashboard"];

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

const APP: &[Fragment] = &[&[("type", APP_TYPES)]];
const DATASET: &[Fragment] = &[&[("type", DATASET_TYPES)]];
const DOCUMENT: &[Fragment] = &[&[("type", DOCUMENT_TYPES)]];
const MAP: &[Fragment] = &[&[("type", MAP_TYPES)]];
const SITE: &[Fragment] = &[&[("type", SITE_TYPES)]];
const INITIATIVE: &[Fragment] = &[&[("type", INITIATIVE_TYPES)]];
const TEMPLATE: &[Fragment] = &[&[("type", TEMPLATE_TYPES)]];
const FEEDBACK: &[Fragment] = &[&[("type", FEEDBACK_TYPES)]];
const EXPERIENCE: &[Fragment] = &[&[("type", EXPERIENCE_TYPES)]];
const STORYMAP: &[Fragment] = &[
    &[("type", STORYMAP_TYPE)],
    &[
        ("type", WEB_MAPPING_APPLICATION),
        ("typekeywords", STORYMAP_KEYWORD),
    ],
];
const DASHBOARD: &[Fragment] = &[
    &[("type", DASHBOARD_TYPE)],
    &[
        ("type", WEB_MAPPING_APPLICATION),
        ("typekeywords", DASHBOARD_TYPE),
    ],
];

/// Tokens starting with `$` are named filters, registered or not.
pub fn is_named_filter_token(value: &str) -> bool {
    value.starts_with('$')
}

/// Looks up the alternatives a named filter expands to.
pub fn lookup_named_filter(token: &str) -> Option<&'static [Fragment]> {
    match token {
        "$app" | "$apps" => Some(APP),
        "$dataset" | "$datasets" => Some(DATASET),
        "$document" | "$documents" => Some(DOCUMENT),
        "$map" | "$maps" => Some(MAP),
        "$site" | "$sites" => Some(SITE),
        "$initiative" | "$initiatives" => Some(INITIATIVE),
        "$template" | "$templates" => Some(TEMPLATE),
        "$feedback" => Some(FEEDBACK),
        "$experience" | "$experiences" => Some(EXPERIENCE),
        "$storymap" | "$storymaps" => Some(STORYMAP),
        "$dashboard" | "$dashboards" => Some(DASHBOARD),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_tokens_resolve() {
        let dataset = lookup_named_filter("$dataset").expect("registered");
        assert_eq!(dataset.len(), 1);
        assert!(dataset[0][0].1.contains(&"Feature Service"));
        assert_eq!(lookup_named_filter("$storymap").map(<[_]>::len), Some(2));
    }

    #[test]
    fn unknown_tokens_do_not_resolve() {
        assert!(lookup_named_filter("$nope").is_none());
        assert!(lookup_named_filter("dataset").is_none());
    }

    #[test]
    fn token_detection_uses_prefix() {
        assert!(is_named_filter_token("$dataset"));
        assert!(!is_named_filter_token("Web Map"));
    }
}
