//! Image MIME sniffing and data-URL helpers.

pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x47, 0x49, 0x46, 0x38, ..] => "image/gif",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        _ => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}

pub fn to_data_url(mime: &str, base64_payload: &str) -> String {
    format!("data:{};base64,{}", mime, base64_payload)
}

/// Split `data:<mime>[;param=value]*;base64,<payload>` into its bare MIME
/// type and payload.
///
/// Returns `None` for anything that is not a base64 data URL.
pub fn parse_data_url(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let params = header.strip_suffix(";base64")?;
    // Drop media-type parameters such as `;name=x.png`.
    let mime = params.split(';').next().unwrap_or_default().trim();
    let mime = if mime.is_empty() { "image/jpeg" } else { mime };
    Some((mime, payload))
}
