//! Joining and comparing dual-backend analysis outputs

/// Extract the severity verdict an analysis text settled on, if any.
/// The highest severity mentioned wins.
pub fn severity_verdict(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    for (needle, verdict) in [
        ("critical", "CRITICAL"),
        ("error", "ERROR"),
        ("warn", "WARN"),
        ("info", "INFO"),
    ] {
        if lower.contains(needle) {
            return Some(verdict);
        }
    }
    None
}

/// Join cloud and local outputs with labeled separators, appending an
/// agreement note when both sides reached a severity verdict.
pub fn join_outputs(
    cloud_model: &str,
    cloud_text: &str,
    local_model: &str,
    local_text: &str,
) -> String {
    let mut joined = format!(
        "=== cloud ({}) ===\n{}\n\n=== local ({}) ===\n{}",
        cloud_model,
        cloud_text.trim_end(),
        local_model,
        local_text.trim_end(),
    );

    match (severity_verdict(cloud_text), severity_verdict(local_text)) {
        (Some(cloud), Some(local)) if cloud == local => {
            joined.push_str(&format!("\n\nBackends agree on severity: {}.", cloud));
        }
        (Some(cloud), Some(local)) => {
            joined.push_str(&format!(
                "\n\nBackends disagree on severity: cloud says {}, local says {}.",
                cloud, local
            ));
        }
        _ => {}
    }

    joined
}
