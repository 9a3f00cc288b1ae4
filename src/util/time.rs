/// Get a timestamp in milliseconds since the UNIX epoch
pub fn timestamp_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// File name used when the composition is saved to the gallery
pub fn gallery_filename() -> String {
    format!("canvas_{}.png", timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_filename_is_timestamped_png() {
        let name = gallery_filename();
        let stamp = name
            .strip_prefix("canvas_")
            .and_then(|rest| rest.strip_suffix(".png"))
            .unwrap();
        assert!(stamp.parse::<u128>().unwrap() > 0);
    }
}
