/// Name of the host the exporter runs on, for `cinder_exporter_info`.
pub fn hostname() -> String {
    ::hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
