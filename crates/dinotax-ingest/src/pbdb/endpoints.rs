//! PBDB endpoint URL and query builders

/// Query parameters as passed to `reqwest::RequestBuilder::query`
pub type QueryParams = Vec<(&'static str, String)>;

/// Build taxa list URL
pub fn taxa_list_url(base_url: &str) -> String {
    format!("{}/taxa/list.json", base_url.trim_end_matches('/'))
}

/// Build single taxon URL
pub fn taxa_single_url(base_url: &str) -> String {
    format!("{}/taxa/single.json", base_url.trim_end_matches('/'))
}

/// Accepted, extinct, regularly preserved species under `group`, older than `min_ma`
///
/// `pres=regular` already drops most form taxa upstream; the local filter
/// catches what slips through.
pub fn group_species_params(group: &str, min_ma: f64) -> QueryParams {
    vec![
        ("base_name", group.to_string()),
        ("rank", "species".to_string()),
        ("status", "accepted".to_string()),
        ("vocab", "pbdb".to_string()),
        ("show", "attr,parent,app,family".to_string()),
        ("pres", "regular".to_string()),
        ("extant", "no".to_string()),
        ("limit", "all".to_string()),
        ("min_ma", min_ma.to_string()),
    ]
}

/// Exact-name species lookup
pub fn species_by_name_params(name: &str) -> QueryParams {
    vec![
        ("name", name.to_string()),
        ("rank", "species".to_string()),
        ("status", "valid".to_string()),
        ("vocab", "pbdb".to_string()),
        ("show", "attr,app,parent".to_string()),
    ]
}

/// Point lookup by taxon id; the response uses compact field codes
pub fn taxon_by_id_params(id: &str) -> QueryParams {
    vec![
        ("id", id.to_string()),
        ("show", "attr,app,parent".to_string()),
    ]
}
